//! Dynamically typed values passed to database operations.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single bound argument, or the query text itself once flattened.
///
/// Equality is structural. Two `Handle` values are equal only when they
/// refer to the same handle instance. `Float` values compare by bit
/// pattern, so `NaN` equals an identical `NaN` and `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Handle(Uuid),
}

impl Value {
    /// Name of the variant, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Duration(_) => "duration",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Handle(_) => "handle",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Handle(a), Value::Handle(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Duration(d) => write!(f, "{d:?}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Json(j) => write!(f, "{j}"),
            Value::Handle(id) => write!(f, "handle:{id}"),
        }
    }
}

/// Joins values the way they appear in call diagnostics: `"a", 1, NULL`.
pub(crate) fn display_list<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the ordered argument list used for matching: query text first,
/// then each bound argument in call order.
#[must_use]
pub fn flatten_args(sql: &str, args: &[Value]) -> Vec<Value> {
    let mut flat = Vec::with_capacity(args.len() + 1);
    flat.push(Value::Text(sql.to_string()));
    flat.extend_from_slice(args);
    flat
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_puts_sql_first() {
        let flat = flatten_args("SELECT 1", &[Value::from(42), Value::from("x")]);
        assert_eq!(
            flat,
            vec![Value::from("SELECT 1"), Value::Int(42), Value::from("x")]
        );
    }

    #[test]
    fn test_flatten_without_args() {
        let flat = flatten_args("SELECT now()", &[]);
        assert_eq!(flat, vec![Value::Text("SELECT now()".to_string())]);
    }

    #[test]
    fn test_integer_conversions_agree() {
        assert_eq!(Value::from(5_i32), Value::from(5_i64));
        assert_eq!(Value::from(5_u32), Value::Int(5));
    }

    #[test]
    fn test_floats_compare_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Float(1.0), Value::Int(1));
    }

    #[test]
    fn test_option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("t").to_string(), "\"t\"");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from(vec![1_u8, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(
            display_list(&[Value::from("SELECT 1"), Value::from(42)]),
            "\"SELECT 1\", 42"
        );
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(Value::Int(7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "int", "value": 7}));
    }
}
