//! Typed reads from the accumulated wizard values.
//!
//! Stages run after every step validated, so a missing or malformed value
//! here means the definition and the stage disagree. That is reported as a
//! rejected request rather than a panic.

use mosaic_core::types::{as_number, as_text, is_blank};
use mosaic_core::{FieldMap, ProviderError};
use serde_json::Value;

fn missing(name: &str) -> ProviderError {
    ProviderError::Rejected(format!("missing field {}", name))
}

pub(crate) fn text(values: &FieldMap, name: &str) -> Result<String, ProviderError> {
    values
        .get(name)
        .filter(|v| !is_blank(v))
        .and_then(as_text)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| missing(name))
}

pub(crate) fn number(values: &FieldMap, name: &str) -> Result<f64, ProviderError> {
    values
        .get(name)
        .and_then(as_number)
        .ok_or_else(|| missing(name))
}

pub(crate) fn whole_number<T: TryFrom<i64>>(
    values: &FieldMap,
    name: &str,
) -> Result<T, ProviderError> {
    let n = number(values, name)?;
    if n.fract() != 0.0 {
        return Err(ProviderError::Rejected(format!("{} must be a whole number", name)));
    }
    T::try_from(n as i64)
        .map_err(|_| ProviderError::Rejected(format!("{} is out of range", name)))
}

pub(crate) fn optional_number(values: &FieldMap, name: &str) -> Option<f64> {
    values.get(name).filter(|v| !is_blank(v)).and_then(as_number)
}

pub(crate) fn flag(values: &FieldMap, name: &str) -> bool {
    match values.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim(), "true" | "yes" | "on" | "1"),
        _ => false,
    }
}

pub(crate) fn list(values: &FieldMap, name: &str) -> Result<Vec<String>, ProviderError> {
    match values.get(name) {
        Some(Value::Array(items)) => Ok(items.iter().filter_map(as_text).collect()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()),
        _ => Err(missing(name)),
    }
}

/// Keep only the digits of a document number
pub(crate) fn digits(values: &FieldMap, name: &str) -> Result<String, ProviderError> {
    Ok(text(values, name)?.chars().filter(char::is_ascii_digit).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> FieldMap {
        let mut values = FieldMap::new();
        values.insert("name".into(), json!("  Анна "));
        values.insert("blank".into(), json!("   "));
        values.insert("rent".into(), json!("45 000"));
        values.insert("rooms".into(), json!(["kitchen", "bedroom"]));
        values.insert("csv".into(), json!("avito, cian,"));
        values.insert("passport".into(), json!("1234 567890"));
        values.insert("agreed".into(), json!("yes"));
        values
    }

    #[test]
    fn test_text() {
        assert_eq!(text(&values(), "name").unwrap(), "Анна");
        assert!(text(&values(), "blank").is_err());
        assert!(matches!(text(&values(), "nope"), Err(ProviderError::Rejected(_))));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(number(&values(), "rent").unwrap(), 45000.0);
        assert_eq!(optional_number(&values(), "blank"), None);
        assert_eq!(optional_number(&values(), "rent"), Some(45000.0));
    }

    #[test]
    fn test_whole_numbers() {
        let mut values = values();
        values.insert("day".into(), json!(15));
        assert_eq!(whole_number::<u8>(&values, "day").unwrap(), 15);

        values.insert("day".into(), json!(15.7));
        assert!(matches!(whole_number::<u8>(&values, "day"), Err(ProviderError::Rejected(_))));

        values.insert("day".into(), json!(300));
        assert!(whole_number::<u8>(&values, "day").is_err());
        values.insert("day".into(), json!("NaN"));
        assert!(whole_number::<u8>(&values, "day").is_err());
    }

    #[test]
    fn test_lists_and_flags() {
        assert_eq!(list(&values(), "rooms").unwrap(), vec!["kitchen", "bedroom"]);
        assert_eq!(list(&values(), "csv").unwrap(), vec!["avito", "cian"]);
        assert!(list(&values(), "nope").is_err());
        assert!(flag(&values(), "agreed"));
        assert!(!flag(&values(), "nope"));
        assert_eq!(digits(&values(), "passport").unwrap(), "1234567890");
    }
}
