//! Step validation
//!
//! Validation is a pure function of a step definition and the accumulated
//! field values. It never fails: problems come back as per-field messages
//! that the caller renders inline.

use crate::domain::wizard_definition::StepDefinition;
use crate::types::{as_number, as_text, is_field_blank, FieldMap};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Message used for blank required fields
pub const REQUIRED_MESSAGE: &str = "This field is required";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of validating one step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty
    pub valid: bool,

    /// Field name to message
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    /// A passing result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// Build a result from collected errors
    pub fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Message for a field, if it failed
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// Declarative cross-field rule attached to a step
///
/// A rule whose referenced fields are blank is skipped; the required-field
/// policy is responsible for reporting missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldRule {
    /// `start` must be strictly before `end` (ISO `YYYY-MM-DD` dates)
    DateOrder {
        /// Field holding the first date
        start: String,
        /// Field holding the second date
        end: String,
    },
    /// Number strictly greater than zero
    Positive {
        /// Checked field
        field: String,
    },
    /// Number within an inclusive range
    Range {
        /// Checked field
        field: String,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Number without a fractional part
    WholeNumber {
        /// Checked field
        field: String,
    },
    /// Calendar date in ISO `YYYY-MM-DD` form
    Date {
        /// Checked field
        field: String,
    },
    /// Exactly `digits` decimal digits, whitespace ignored
    DigitCount {
        /// Checked field
        field: String,
        /// Expected number of digits
        digits: usize,
    },
    /// Value (or every element of a list value) is one of `options`
    OneOf {
        /// Checked field
        field: String,
        /// Allowed values
        options: Vec<String>,
    },
    /// List value with at least `min` elements
    MinItems {
        /// Checked field
        field: String,
        /// Minimum element count
        min: usize,
    },
    /// Boolean that must be `true` (consent checkboxes)
    Accepted {
        /// Checked field
        field: String,
    },
}

impl FieldRule {
    /// Fields this rule reads
    pub fn fields(&self) -> Vec<&str> {
        match self {
            FieldRule::DateOrder { start, end } => vec![start.as_str(), end.as_str()],
            FieldRule::Positive { field }
            | FieldRule::Range { field, .. }
            | FieldRule::WholeNumber { field }
            | FieldRule::Date { field }
            | FieldRule::DigitCount { field, .. }
            | FieldRule::OneOf { field, .. }
            | FieldRule::MinItems { field, .. }
            | FieldRule::Accepted { field } => vec![field.as_str()],
        }
    }

    /// Evaluate the rule, returning the failing field and its message
    pub fn check(&self, values: &FieldMap) -> Option<(String, String)> {
        if self.fields().iter().any(|f| is_field_blank(values, f)) {
            return None;
        }
        let get = |f: &str| values.get(f).unwrap_or(&Value::Null);

        match self {
            FieldRule::DateOrder { start, end } => {
                let from = match parse_date(get(start)) {
                    Some(d) => d,
                    None => return Some((start.clone(), invalid_date())),
                };
                let to = match parse_date(get(end)) {
                    Some(d) => d,
                    None => return Some((end.clone(), invalid_date())),
                };
                if from >= to {
                    return Some((end.clone(), "End date must be after start date".to_string()));
                }
                None
            }
            FieldRule::Positive { field } => match as_number(get(field)) {
                None => Some((field.clone(), "Must be a number".to_string())),
                Some(n) if n <= 0.0 => Some((field.clone(), "Must be greater than zero".to_string())),
                Some(_) => None,
            },
            FieldRule::Range { field, min, max } => match as_number(get(field)) {
                None => Some((field.clone(), "Must be a number".to_string())),
                Some(n) if n < *min || n > *max => {
                    Some((field.clone(), format!("Must be between {} and {}", min, max)))
                }
                Some(_) => None,
            },
            FieldRule::WholeNumber { field } => match as_number(get(field)) {
                None => Some((field.clone(), "Must be a number".to_string())),
                Some(n) if n.fract() != 0.0 => {
                    Some((field.clone(), "Must be a whole number".to_string()))
                }
                Some(_) => None,
            },
            FieldRule::Date { field } => match parse_date(get(field)) {
                None => Some((field.clone(), invalid_date())),
                Some(_) => None,
            },
            FieldRule::DigitCount { field, digits } => {
                let text = as_text(get(field)).unwrap_or_default();
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                if compact.len() == *digits && compact.chars().all(|c| c.is_ascii_digit()) {
                    None
                } else {
                    Some((field.clone(), format!("Must contain exactly {} digits", digits)))
                }
            }
            FieldRule::OneOf { field, options } => {
                let allowed = |v: &Value| v.as_str().map_or(false, |s| options.iter().any(|o| o == s));
                let ok = match get(field) {
                    Value::Array(items) => items.iter().all(allowed),
                    other => allowed(other),
                };
                if ok {
                    None
                } else {
                    Some((field.clone(), format!("Must be one of: {}", options.join(", "))))
                }
            }
            FieldRule::MinItems { field, min } => match get(field) {
                Value::Array(items) if items.len() >= *min => None,
                Value::Array(_) => Some((field.clone(), format!("Select at least {}", min))),
                _ => Some((field.clone(), "Must be a list".to_string())),
            },
            FieldRule::Accepted { field } => match get(field) {
                Value::Bool(true) => None,
                _ => Some((field.clone(), "Must be accepted".to_string())),
            },
        }
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
}

fn invalid_date() -> String {
    "Invalid date, expected YYYY-MM-DD".to_string()
}

/// Validates a step against accumulated values
pub trait StepValidator: Send + Sync {
    /// Validate `step` using the whole value map, so cross-step reads work
    fn validate(&self, step: &StepDefinition, values: &FieldMap) -> ValidationResult;
}

/// Required-field policy followed by the step's declarative rules
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStepValidator;

impl StepValidator for DefaultStepValidator {
    fn validate(&self, step: &StepDefinition, values: &FieldMap) -> ValidationResult {
        let mut errors = BTreeMap::new();

        for field in step.fields.iter().filter(|f| f.required) {
            if is_field_blank(values, &field.name) {
                errors.insert(field.name.clone(), REQUIRED_MESSAGE.to_string());
            }
        }

        for rule in &step.rules {
            if let Some((field, message)) = rule.check(values) {
                // first message per field wins
                errors.entry(field).or_insert(message);
            }
        }

        ValidationResult::from_errors(errors)
    }
}
