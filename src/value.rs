//! Application-side parameter values
//!
//! A [`Value`] is what callers hand to
//! [`PreparedStatement::set_parameter`](crate::PreparedStatement::set_parameter).
//! It is converted to the declared parameter type by [`crate::coerce`].

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{Blob, Clob, LobSource, Numeric};

/// Value supplied by the application for a parameter
#[derive(Debug)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// 8-bit integer
    TinyInt(i8),
    /// 16-bit integer
    SmallInt(i16),
    /// 32-bit integer
    Integer(i32),
    /// 64-bit integer
    BigInt(i64),
    /// 32-bit float
    Real(f32),
    /// 64-bit float
    Double(f64),
    /// Exact decimal
    Decimal(Numeric),
    /// Character string
    String(String),
    /// Byte sequence
    Bytes(Bytes),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
    /// Date and time at a fixed offset
    TimestampTz(DateTime<FixedOffset>),
    /// Binary large object
    Blob(Blob),
    /// Character large object
    Clob(Clob),
    /// Binary stream, read at execute time
    BinaryStream(LobSource),
    /// Character stream, read at execute time
    CharacterStream(LobSource),
    /// Serializable application object, for OTHER columns
    Object(serde_json::Value),
}

impl Value {
    /// Serialize an application object for an OTHER parameter
    pub fn object<T: Serialize>(value: &T) -> Result<Value> {
        serde_json::to_value(value)
            .map(Value::Object)
            .map_err(|e| Error::UnsupportedValueType(format!("value is not serializable: {}", e)))
    }

    /// Check if this is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a stream that must be re-supplied every execution
    pub fn is_stream(&self) -> bool {
        matches!(self, Value::BinaryStream(_) | Value::CharacterStream(_))
    }

    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::TinyInt(_) => "i8",
            Value::SmallInt(_) => "i16",
            Value::Integer(_) => "i32",
            Value::BigInt(_) => "i64",
            Value::Real(_) => "f32",
            Value::Double(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamp with offset",
            Value::Blob(_) => "blob",
            Value::Clob(_) => "clob",
            Value::BinaryStream(_) => "binary stream",
            Value::CharacterStream(_) => "character stream",
            Value::Object(_) => "object",
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    Numeric => Decimal,
    String => String,
    Bytes => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
    Blob => Blob,
    Clob => Clob,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_from_impls() {
        assert!(matches!(Value::from(42i32), Value::Integer(42)));
        assert!(matches!(Value::from("x"), Value::String(ref s) if s == "x"));
        assert!(matches!(Value::from(None::<i64>), Value::Null));
        assert!(matches!(Value::from(Some(7i64)), Value::BigInt(7)));
        assert!(matches!(Value::from(vec![1u8, 2]), Value::Bytes(ref b) if b.len() == 2));
    }

    #[test]
    fn test_object() {
        let v = Value::object(&Point { x: 1, y: 2 }).unwrap();
        match v {
            Value::Object(json) => assert_eq!(json["y"], 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stream_flags() {
        let v = Value::BinaryStream(LobSource::from_bytes(vec![1u8]));
        assert!(v.is_stream());
        assert_eq!(v.type_name(), "binary stream");
        assert!(!Value::Null.is_stream());
    }
}
