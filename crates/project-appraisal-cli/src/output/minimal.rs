use serde_json::Value;

use super::{display_value, result_of};

/// Print just the headline figure.
///
/// Looks for the well-known indicators in priority order, descending into
/// `metrics` and `parameters`, then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    let priority_keys = [
        "npv",
        "irr",
        "payback_period",
        "discounted_payback_period",
        "total_discounted_cash_flow",
    ];

    if let Value::Object(map) = result {
        let scopes = [Some(result), map.get("metrics"), map.get("parameters")];
        for scope in scopes.into_iter().flatten() {
            for key in &priority_keys {
                if let Some(val) = scope.get(*key).filter(|v| !v.is_null()) {
                    println!("{}", display_value(val, "null"));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{key}: {}", display_value(val, "null"));
            return;
        }
    }

    println!("{}", display_value(result, "null"));
}
