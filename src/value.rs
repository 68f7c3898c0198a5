//! Scalar values exchanged with the storage engine.
//!
//! `Value` is what flows into parameter maps and out of row cursors,
//! `ValueType` is the declared type of a persisted field, and `KeyValue` is the
//! hashable subset of `Value` usable as an identity-map key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named statement parameters: parameter name (including its dialect prefix,
/// e.g. `@p0`) → bound value.
///
/// A `BTreeMap` keeps rendering and logging deterministic.
pub type Params = BTreeMap<String, Value>;

/// Declared type of a persisted field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Real,
    Text,
    Boolean,
    Blob,
}

impl ValueType {
    /// Column type used when deriving table definitions
    pub fn sql_type(&self) -> &'static str {
        match self {
            ValueType::Integer | ValueType::Boolean => "INTEGER",
            ValueType::Real => "REAL",
            ValueType::Text => "TEXT",
            ValueType::Blob => "BLOB",
        }
    }

    /// Whether values of this type can identify an entity
    pub fn can_be_key(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Text | ValueType::Blob)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "integer",
            ValueType::Real => "real",
            ValueType::Text => "text",
            ValueType::Boolean => "boolean",
            ValueType::Blob => "blob",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert a storage value into the declared field type.
    ///
    /// SQLite has no boolean storage class, so integers are accepted for
    /// `Boolean` fields; integers widen to `Real`. Returns `None` when the
    /// value cannot represent the requested type.
    pub fn convert_to(self, value_type: ValueType) -> Option<Value> {
        match (self, value_type) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Integer(i), ValueType::Integer) => Some(Value::Integer(i)),
            (Value::Integer(i), ValueType::Boolean) => Some(Value::Boolean(i != 0)),
            (Value::Integer(i), ValueType::Real) => Some(Value::Real(i as f64)),
            (Value::Boolean(b), ValueType::Boolean) => Some(Value::Boolean(b)),
            (Value::Boolean(b), ValueType::Integer) => Some(Value::Integer(i64::from(b))),
            (Value::Real(r), ValueType::Real) => Some(Value::Real(r)),
            (Value::Text(s), ValueType::Text) => Some(Value::Text(s)),
            (Value::Blob(b), ValueType::Blob) => Some(Value::Blob(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
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

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
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
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Hashable primary-key value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl KeyValue {
    /// Key of a value read from storage or set on an object.
    /// `NULL` and non-key types have no key.
    pub fn from_value(value: &Value) -> Option<KeyValue> {
        match value {
            Value::Integer(i) => Some(KeyValue::Integer(*i)),
            Value::Text(s) => Some(KeyValue::Text(s.clone())),
            Value::Blob(b) => Some(KeyValue::Blob(b.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::Integer(i) => Value::Integer(*i),
            KeyValue::Text(s) => Value::Text(s.clone()),
            KeyValue::Blob(b) => Value::Blob(b.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_reads_from_integer_storage() {
        assert_eq!(
            Value::Integer(1).convert_to(ValueType::Boolean),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            Value::Integer(0).convert_to(ValueType::Boolean),
            Some(Value::Boolean(false))
        );
    }

    #[test]
    fn test_incompatible_conversion_is_rejected() {
        assert_eq!(Value::Text("x".into()).convert_to(ValueType::Integer), None);
        assert_eq!(Value::Null.convert_to(ValueType::Text), Some(Value::Null));
    }

    #[test]
    fn test_key_value_excludes_null_and_real() {
        assert_eq!(KeyValue::from_value(&Value::Null), None);
        assert_eq!(KeyValue::from_value(&Value::Real(1.5)), None);
        assert_eq!(
            KeyValue::from_value(&Value::Integer(7)),
            Some(KeyValue::Integer(7))
        );
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Integer(3), Value::Text("a".into()), Value::Null])
            .unwrap();
        assert_eq!(json, r#"[3,"a",null]"#);
    }
}
