pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` member of a computation envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Render a single cell.
///
/// Objects tagged with `status` (IRR outcome, payback) collapse to
/// `status` or `status (value)`.
pub(crate) fn display_value(value: &Value, null_text: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null_text.to_string(),
        Value::Array(arr) => arr
            .iter()
            .map(|v| display_value(v, null_text))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => match tagged_status(map) {
            Some(text) => text,
            None => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}

fn tagged_status(map: &Map<String, Value>) -> Option<String> {
    let status = map.get("status")?.as_str()?;
    let details: Vec<String> = map
        .iter()
        .filter(|(k, _)| k.as_str() != "status")
        .map(|(_, v)| display_value(v, ""))
        .collect();
    if details.is_empty() {
        Some(status.to_string())
    } else {
        Some(format!("{status} ({})", details.join(", ")))
    }
}

/// First array of objects in `value`, searching one level of nesting.
///
/// This is the schedule for `appraise`, `schedule` and `snapshot`, or the
/// per-period breakdown for `npv`.
pub(crate) fn first_row_set(value: &Value) -> Option<(&str, &[Value])> {
    let map = value.as_object()?;
    let is_rows = |v: &Value| matches!(v, Value::Array(a) if a.first().is_some_and(Value::is_object));

    for (key, val) in map {
        if is_rows(val) {
            return val.as_array().map(|a| (key.as_str(), a.as_slice()));
        }
    }
    for val in map.values() {
        if let Some(found) = val.as_object().and_then(|_| first_row_set(val)) {
            return Some(found);
        }
    }
    None
}
