// Dynamically typed SQL value

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single SQL value as exchanged with the session runtime.
///
/// Variant order matters for untagged deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type name used in conversion errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    /// Interpret a literal typed on a command line.
    ///
    /// `null`, `true`/`false`, integers and reals map to their variants;
    /// single-quoted input is always text; everything else is text as-is.
    pub fn parse_literal(input: &str) -> Value {
        let trimmed = input.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
            return Value::Text(trimmed[1..trimmed.len() - 1].to_string());
        }
        if trimmed.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Real(f);
            }
        }
        Value::Text(input.to_string())
    }

    pub(crate) fn conversion_error(&self, target: &str) -> DomainError {
        DomainError::Conversion {
            value: format!("{} ({})", self, self.kind()),
            target: target.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(bytes) => {
                write!(f, "x'")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Typed extraction from a [`Value`]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Real(r) if r.fract() == 0.0 && r.is_finite() => Ok(*r as i64),
            Value::Text(s) => s.trim().parse().map_err(|_| value.conversion_error("i64")),
            _ => Err(value.conversion_error("i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| value.conversion_error("i32"))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            Value::Text(s) => s.trim().parse().map_err(|_| value.conversion_error("f64")),
            _ => Err(value.conversion_error("f64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(value.conversion_error("bool")),
            },
            _ => Err(value.conversion_error("bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Null | Value::Blob(_) => Err(value.conversion_error("String")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(value.conversion_error("Vec<u8>")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse_literal("null"), Value::Null);
        assert_eq!(Value::parse_literal("TRUE"), Value::Bool(true));
        assert_eq!(Value::parse_literal("42"), Value::Integer(42));
        assert_eq!(Value::parse_literal("-1.5"), Value::Real(-1.5));
        assert_eq!(Value::parse_literal("'42'"), Value::Text("42".to_string()));
        assert_eq!(
            Value::parse_literal("hello world"),
            Value::Text("hello world".to_string())
        );
        // "inf" parses as f64 but is not a usable SQL literal
        assert_eq!(Value::parse_literal("inf"), Value::Text("inf".to_string()));
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(i64::from_value(&Value::Text(" 7 ".into())).unwrap(), 7);
        assert_eq!(i64::from_value(&Value::Real(3.0)).unwrap(), 3);
        assert!(i64::from_value(&Value::Real(3.5)).is_err());
        assert!(i32::from_value(&Value::Integer(i64::MAX)).is_err());
        assert!(bool::from_value(&Value::Integer(1)).unwrap());
        assert_eq!(
            Option::<String>::from_value(&Value::Null).unwrap(),
            None::<String>
        );
        assert!(String::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_conversion_error_message() {
        let err = i64::from_value(&Value::Text("abc".into())).unwrap_err();
        assert_eq!(err.to_string(), "Cannot convert abc (TEXT) to i64");
    }

    #[test]
    fn test_display_and_json() {
        assert_eq!(Value::Blob(vec![0xde, 0xad]).to_string(), "x'dead'");
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(1),
            Value::Text("a".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,1,"a"]"#);
    }
}
