use serde_json::Value;
use std::io;

use super::{display_value, first_row_set, result_of};

/// Write output as CSV to stdout.
///
/// Results carrying per-period rows (the schedule) are written one row per
/// period; anything else becomes a two-column `field,value` listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    if let Some((_, rows)) = first_row_set(result) {
        write_rows(&mut wtr, rows);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &display_value(val, "")]);
        }
    } else {
        let _ = wtr.write_record([&display_value(result, "")]);
    }

    let _ = wtr.flush();
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);

    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(|v| display_value(v, "")).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
