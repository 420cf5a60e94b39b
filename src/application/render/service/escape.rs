//! Escape discipline for the serialize → substitute → re-parse round trips.
//!
//! The document tree is substituted in its serialized string form and parsed
//! back as JSON. Payload strings are escaped before substitution, and raw
//! control characters introduced by substitution are re-escaped afterwards;
//! either step missing corrupts the re-parse.

use serde_json::Value;

/// Deep-escape every string leaf of a payload so substituted values stay
/// JSON-string-safe. Non-string scalars pass through unchanged.
pub fn escape_payload(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(escape_json_string(text)),
        Value::Array(items) => Value::Array(items.iter().map(escape_payload).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), escape_payload(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn escape_json_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Re-escape raw control characters in a substituted JSON string. The
/// serializer never emits them unescaped, so every occurrence came from
/// substitution.
pub fn reescape_control_characters(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
