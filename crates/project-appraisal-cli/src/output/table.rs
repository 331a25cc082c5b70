use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{display_value, result_of};

/// Format output as tables using the tabled crate.
///
/// Scalars and tagged outcomes go into a Field/Value table with nested
/// objects flattened to dotted keys; arrays of objects (schedule, summary
/// indicators) get a table of their own.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    match result {
        Value::Object(map) => {
            let mut fields = Vec::new();
            let mut row_sets = Vec::new();
            collect(map, "", &mut fields, &mut row_sets);

            if !fields.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in fields {
                    builder.push_record([key, val]);
                }
                println!("{}", Table::from(builder));
            }
            for (name, rows) in row_sets {
                println!("\n{name}:");
                print_rows(rows);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", display_value(result, "null")),
    }

    if let Some(envelope) = value.as_object().filter(|m| m.contains_key("result")) {
        print_footer(envelope);
    }
}

fn collect<'a>(
    map: &'a Map<String, Value>,
    prefix: &str,
    fields: &mut Vec<(String, String)>,
    row_sets: &mut Vec<(String, &'a [Value])>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
                row_sets.push((name, arr.as_slice()));
            }
            Value::Object(inner) if !inner.contains_key("status") => {
                collect(inner, &name, fields, row_sets);
            }
            _ => fields.push((name, display_value(val, "null"))),
        }
    }
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", display_value(item, "null"));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| {
                    map.get(h.as_str())
                        .map(|v| display_value(v, "null"))
                        .unwrap_or_default()
                })
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}
