//! FILENAME: records/src/value.rs
//! Field values - the scalar value model for table records.
//!
//! Every record field holds one of these. The row-model pipeline leans on
//! two coercions defined here: truthiness (for truthy-counting aggregates
//! and boolean-deriving grouping keys) and numeric coercion (for sums).

use serde::{Deserialize, Serialize};

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Missing / null / undefined.
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Truthiness: empty, empty string, zero (or NaN) and false are falsy;
    /// everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Empty => false,
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Boolean(b) => *b,
        }
    }

    /// Numeric view of the value. Only actual numbers coerce; text and
    /// booleans do not participate in numeric aggregation.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the display form of the value as a String.
    /// Group keys use this for stable node identifiers, so the formatting
    /// must stay deterministic.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Text(s) => s.clone(),
            FieldValue::Boolean(b) => {
                if *b { "TRUE" } else { "FALSE" }.to_string()
            }
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Empty
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// `None` maps to `Empty`, mirroring how nullable source fields arrive.
impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => FieldValue::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!FieldValue::Empty.is_truthy());
        assert!(!FieldValue::Number(0.0).is_truthy());
        assert!(!FieldValue::Number(f64::NAN).is_truthy());
        assert!(!FieldValue::Text(String::new()).is_truthy());
        assert!(!FieldValue::Boolean(false).is_truthy());

        assert!(FieldValue::Number(0.5).is_truthy());
        assert!(FieldValue::Number(-3.0).is_truthy());
        assert!(FieldValue::Text("x".to_string()).is_truthy());
        assert!(FieldValue::Boolean(true).is_truthy());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(FieldValue::Number(12.5).as_number(), Some(12.5));
        assert_eq!(FieldValue::Text("12.5".to_string()).as_number(), None);
        assert_eq!(FieldValue::Boolean(true).as_number(), None);
        assert_eq!(FieldValue::Empty.as_number(), None);
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(FieldValue::Number(45.0).display(), "45");
        assert_eq!(FieldValue::Number(45.25).display(), "45.25");
        assert_eq!(FieldValue::Text("Email".to_string()).display(), "Email");
        assert_eq!(FieldValue::Boolean(true).display(), "TRUE");
        assert_eq!(FieldValue::Empty.display(), "");
    }

    #[test]
    fn test_option_conversion() {
        let absent: Option<f64> = None;
        assert_eq!(FieldValue::from(absent), FieldValue::Empty);
        assert_eq!(FieldValue::from(Some(10.0)), FieldValue::Number(10.0));
    }
}
