//! Property-bag coercion helpers.
//!
//! Government feature layers are unit-inconsistent and partially nullable:
//! numbers arrive as strings, absent fields arrive as `""`, the literal
//! string `"null"`, or JSON null. These helpers apply one uniform rule —
//! anything unusable coerces to absent, never to a default value and never
//! to an error.

use serde_json::{Map, Value};

/// Reads a string field. Empty strings, `"null"`, and JSON null are absent.
#[must_use]
pub fn prop_str(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key) {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a numeric field, coercing numeric-looking strings. A value that
/// fails to parse is absent rather than an error.
#[must_use]
pub fn prop_f64(properties: &Map<String, Value>, key: &str) -> Option<f64> {
    match properties.get(key) {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Reads an integer field, coercing numeric-looking strings.
#[must_use]
pub fn prop_i64(properties: &Map<String, Value>, key: &str) -> Option<i64> {
    match properties.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Reads a boolean field, accepting `"yes"`/`"no"`/`"true"`/`"false"`
/// strings and 0/1 numerics alongside JSON booleans.
#[must_use]
pub fn prop_bool(properties: &Map<String, Value>, key: &str) -> Option<bool> {
    match properties.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "y" | "1" => Some(true),
            "no" | "false" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
