use serde_json::Value;
use std::collections::BTreeMap;

/// Accumulated field values of a wizard, keyed by field name
///
/// Ordered so snapshots and serialized output are stable.
pub type FieldMap = BTreeMap<String, Value>;

/// Returns true when a value counts as "not filled in"
///
/// Null, whitespace-only strings, empty arrays and empty objects are blank.
/// `false` and `0` are values, not blanks.
#[inline]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Returns true when the field is missing from the map or blank
#[inline]
pub fn is_field_blank(values: &FieldMap, field: &str) -> bool {
    values.get(field).map_or(true, is_blank)
}

/// Reads a numeric value, accepting numbers and numeric strings
///
/// Form inputs arrive as text, so `"45000"` and `45000` are treated alike.
/// Only finite numbers count; `"NaN"` and `"inf"` are not numbers here.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(' ', "").parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Reads a value as text, rendering numbers the way a form would show them
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
