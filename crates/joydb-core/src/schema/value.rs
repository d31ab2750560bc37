//! Dynamic scalar values.

use core::cmp::Ordering;
use std::fmt;

/// A dynamic scalar value. `Date`/`Time`/`Email` are not distinct
/// variants: they are validated strings by the time they reach here, and
/// travel as `Text` — validation happens once, at the parser/planner
/// boundary, per the normalize-at-ingest rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Converts a `serde_json::Value` to a `Value`, normalizing
    /// fractional-free JSON numbers to `Int`. Arrays and objects have no
    /// representation here and become `Null`.
    #[must_use]
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Self::Null,
        }
    }

    /// Converts to a `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Canonical textual form used for index keys and WAL replay key
    /// matching: integers as base-10 decimal, strings as-is, booleans as
    /// `true`/`false`. See the design notes on primary-key textual
    /// comparison during recovery.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Equality over normalized scalars. Mixed `Int`/`Float` promote to
    /// `Float`; `Null` is never equal to anything, including another
    /// `Null` (SQL NULL semantics).
    #[must_use]
    pub fn values_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering over numeric scalars (integer coerced to float when
    /// mixed) and lexicographic ordering over strings. Returns `None`
    /// for incomparable pairs (e.g. `Null`, cross-type non-numeric).
    #[must_use]
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Name of the runtime type, for constraint error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_normalizes_integer_floats() {
        let v = Value::from_json(&serde_json::json!(42));
        assert_eq!(v, Value::Int(42));

        let v = Value::from_json(&serde_json::json!(42.5));
        assert_eq!(v, Value::Float(42.5));
    }

    #[test]
    fn test_values_equal_promotes_int_and_float() {
        assert!(Value::Int(3).values_equal(&Value::Float(3.0)));
        assert!(!Value::Int(3).values_equal(&Value::Float(3.5)));
    }

    #[test]
    fn test_null_never_equal() {
        assert!(!Value::Null.values_equal(&Value::Null));
        assert!(!Value::Null.values_equal(&Value::Int(0)));
    }

    #[test]
    fn test_partial_compare_promotes_mixed_numeric() {
        assert_eq!(
            Value::Int(2).partial_compare(&Value::Float(3.0)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_partial_compare_strings_lexicographic() {
        assert_eq!(
            Value::Text("a".into()).partial_compare(&Value::Text("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_canonical_key_forms() {
        assert_eq!(Value::Int(7).canonical_key(), "7");
        assert_eq!(Value::Bool(true).canonical_key(), "true");
        assert_eq!(Value::Text("x".into()).canonical_key(), "x");
    }
}
