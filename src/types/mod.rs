//! Internal typed values
//!
//! This module defines the representation parameter values take after
//! coercion: the values the request builder places into an outgoing
//! request and the engine receives.

mod number;
mod date;
mod lob;

pub use number::Numeric;
pub use date::{
    parse_date, parse_offset, parse_time, parse_timestamp, shift_zone, ZonedTime, ZonedTimestamp,
};
pub use lob::{Blob, Clob, LobData, LobHandle, LobKind, LobSource, StreamEncoding, MAX_POS};

use bytes::Bytes;
use chrono::NaiveDate;

use crate::constants::SqlType;

/// Declared type of a parameter slot, as reported by prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterType {
    /// SQL type
    pub sql_type: SqlType,
    /// Precision (characters, bytes or digits), 0 when unbounded
    pub precision: u64,
    /// Scale for exact numerics
    pub scale: u32,
}

impl ParameterType {
    /// Create a type with no precision bound
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            precision: 0,
            scale: 0,
        }
    }

    /// Create a type with precision and scale
    pub fn with_precision(sql_type: SqlType, precision: u64, scale: u32) -> Self {
        Self {
            sql_type,
            precision,
            scale,
        }
    }

    /// Check if a length fits the declared precision
    pub fn accepts_length(&self, length: u64) -> bool {
        self.precision == 0 || length <= self.precision
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.precision, self.sql_type) {
            (0, t) => write!(f, "{}", t),
            (p, SqlType::Numeric | SqlType::Decimal) => {
                write!(f, "{}({},{})", self.sql_type, p, self.scale)
            }
            (p, _) => write!(f, "{}({})", self.sql_type, p),
        }
    }
}

/// A coerced parameter value as carried in a request
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL
    Null,
    /// BOOLEAN
    Boolean(bool),
    /// Any integral type, range checked against the declared type
    Integer(i64),
    /// REAL, FLOAT or DOUBLE
    Double(f64),
    /// NUMERIC or DECIMAL, rescaled to the declared scale
    Decimal(Numeric),
    /// CHAR or VARCHAR
    Char(String),
    /// BINARY or VARBINARY
    Binary(Bytes),
    /// DATE
    Date(NaiveDate),
    /// TIME, with offset for the zoned variant
    Time(ZonedTime),
    /// TIMESTAMP, with offset for the zoned variant
    Timestamp(ZonedTimestamp),
    /// BLOB handle owned by the engine
    Blob(LobHandle),
    /// CLOB handle owned by the engine
    Clob(LobHandle),
    /// OTHER: serialized application object
    Object(Bytes),
}

impl SqlValue {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Double(v) => Some(*v),
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Decimal(n) => n.to_f64().ok(),
            _ => None,
        }
    }

    /// Get as exact decimal
    pub fn as_decimal(&self) -> Option<&Numeric> {
        match self {
            SqlValue::Decimal(n) => Some(n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Char(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            SqlValue::Binary(b) | SqlValue::Object(b) => Some(b),
            _ => None,
        }
    }

    /// Get as date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            SqlValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as time
    pub fn as_time(&self) -> Option<&ZonedTime> {
        match self {
            SqlValue::Time(t) => Some(t),
            _ => None,
        }
    }

    /// Get as timestamp
    pub fn as_timestamp(&self) -> Option<&ZonedTimestamp> {
        match self {
            SqlValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Get the LOB handle of a BLOB or CLOB value
    pub fn as_lob(&self) -> Option<&LobHandle> {
        match self {
            SqlValue::Blob(h) | SqlValue::Clob(h) => Some(h),
            _ => None,
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            SqlValue::Integer(v) => write!(f, "{}", v),
            SqlValue::Double(v) => write!(f, "{}", v),
            SqlValue::Decimal(n) => write!(f, "{}", n),
            SqlValue::Char(s) => write!(f, "'{}'", s),
            SqlValue::Binary(b) | SqlValue::Object(b) => {
                write!(f, "X'")?;
                for byte in b.iter() {
                    write!(f, "{:02X}", byte)?;
                }
                write!(f, "'")
            }
            SqlValue::Date(d) => write!(f, "DATE '{}'", d),
            SqlValue::Time(t) => write!(f, "TIME '{}'", t),
            SqlValue::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts),
            SqlValue::Blob(h) | SqlValue::Clob(h) => {
                write!(f, "{}#{}({})", h.kind.name(), h.id, h.length)
            }
        }
    }
}
