//! Truthiness of substituted condition expressions.

use serde_json::Value;

/// Normalize a substituted string into a boolean.
///
/// The string is trimmed and lowercased, checked against the false-keyword
/// set, then parsed as a JSON literal; a parse failure falls back to
/// non-emptiness. `none` sits in the keyword set because that is how the
/// evaluator renders a JSON `null`.
pub fn string_to_boolean(value: &str) -> bool {
    let normalized = value.to_lowercase().trim().to_string();
    if matches!(
        normalized.as_str(),
        "false" | "null" | "undefined" | "none"
    ) {
        return false;
    }

    match serde_json::from_str::<Value>(&normalized) {
        Ok(parsed) => json_truthiness(&parsed),
        Err(_) => !normalized.is_empty(),
    }
}

fn json_truthiness(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
