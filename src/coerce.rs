//! Conversion of application values to declared parameter types
//!
//! [`coerce`] is a pure function: it never contacts the engine. Values that
//! need engine work before execution (local LOB content, streams, remote
//! BLOBs bound to binary slots) come back as non-value [`Binding`]s for the
//! LOB stager to resolve.
//!
//! Rules are applied in this order:
//! 1. NULL is stored as NULL for every type.
//! 2. A BLOB or CLOB value bound to the matching LOB type is stored as is.
//! 3. Bytes, text or streams bound to a LOB type become pending streams.
//! 4. Bytes, hex strings, BLOBs and binary streams bound to BINARY or
//!    VARBINARY become binary values.
//! 5. Numbers and numeric strings bound to numeric types are parsed and
//!    range checked, decimals are rescaled to the declared scale.
//! 6. Temporal values and strings bound to temporal types are normalized
//!    against the supplied zone and the session zone.
//! 7. Serializable objects bound to OTHER are serialized.
//! 8. Everything else goes through the generic character/boolean conversion.

use bytes::Bytes;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::constants::{SqlType, MAX_IN_MEMORY_LENGTH};
use crate::error::{Error, Result};
use crate::params::{Binding, PendingStream};
use crate::types::{
    parse_date, parse_time, parse_timestamp, shift_zone, Blob, Clob, LobSource, Numeric,
    ParameterType, SqlValue, StreamEncoding, ZonedTime, ZonedTimestamp,
};
use crate::value::Value;

/// Zone information available while coercing temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionContext {
    /// Zone of the session, used for values without their own zone
    pub session_zone: FixedOffset,
    /// Zone supplied with the value by the caller
    pub zone: Option<FixedOffset>,
}

impl CoercionContext {
    /// Context with only the session zone
    pub fn new(session_zone: FixedOffset) -> Self {
        Self {
            session_zone,
            zone: None,
        }
    }

    /// Attach a caller-supplied zone
    pub fn with_zone(mut self, zone: Option<FixedOffset>) -> Self {
        self.zone = zone;
        self
    }
}

/// Coerce an application value to the declared type of a parameter
pub fn coerce(value: Value, target: &ParameterType, ctx: &CoercionContext) -> Result<Binding> {
    if value.is_null() {
        return Ok(Binding::Value(SqlValue::Null));
    }

    if let Some(v) = integral(&value) {
        return coerce_integral(v, target).map(Binding::Value);
    }

    match target.sql_type {
        SqlType::Blob => coerce_blob(value, target),
        SqlType::Clob => coerce_clob(value, target),
        SqlType::Binary | SqlType::VarBinary => coerce_binary(value, target),
        SqlType::Other => coerce_object(value).map(Binding::Value),
        t if t.is_numeric() => coerce_numeric(value, target).map(Binding::Value),
        t if t.is_temporal() => coerce_temporal(value, target, ctx).map(Binding::Value),
        SqlType::Char | SqlType::VarChar => coerce_character(value, target),
        _ => coerce_boolean(value, target).map(Binding::Value),
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(v) => Some(*v as i64),
        Value::SmallInt(v) => Some(*v as i64),
        Value::Integer(v) => Some(*v as i64),
        Value::BigInt(v) => Some(*v),
        _ => None,
    }
}

fn mismatch(value: &Value, target: &ParameterType) -> Error {
    Error::invalid_value(
        target.to_string(),
        format!("incompatible data type in conversion from {}", value.type_name()),
    )
}

fn out_of_range(target: &ParameterType, shown: impl std::fmt::Display) -> Error {
    Error::invalid_value(target.to_string(), format!("numeric value out of range: {}", shown))
}

/// Coerce an integral value, rejecting lossy binary and object targets
pub fn coerce_integral(v: i64, target: &ParameterType) -> Result<SqlValue> {
    match target.sql_type {
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
            check_integral_range(v, target)
        }
        SqlType::Real | SqlType::Float | SqlType::Double => Ok(SqlValue::Double(v as f64)),
        SqlType::Numeric | SqlType::Decimal => decimal_value(Numeric::from_i64(v), target),
        SqlType::Boolean => match v {
            0 => Ok(SqlValue::Boolean(false)),
            1 => Ok(SqlValue::Boolean(true)),
            _ => Err(Error::invalid_value(
                target.to_string(),
                format!("{} is not a boolean value", v),
            )),
        },
        SqlType::Char | SqlType::VarChar => character_value(v.to_string(), target),
        _ => Err(Error::invalid_value(
            target.to_string(),
            "incompatible data type in conversion from integer",
        )),
    }
}

fn check_integral_range(v: i64, target: &ParameterType) -> Result<SqlValue> {
    let (min, max) = match target.sql_type {
        SqlType::TinyInt => (i8::MIN as i64, i8::MAX as i64),
        SqlType::SmallInt => (i16::MIN as i64, i16::MAX as i64),
        SqlType::Integer => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    };
    if v < min || v > max {
        return Err(out_of_range(target, v));
    }
    Ok(SqlValue::Integer(v))
}

fn decimal_value(n: Numeric, target: &ParameterType) -> Result<SqlValue> {
    if target.precision == 0 {
        return Ok(SqlValue::Decimal(n));
    }
    let precision = u32::try_from(target.precision).unwrap_or(u32::MAX);
    if !n.fits(precision, target.scale) {
        return Err(out_of_range(target, &n));
    }
    Ok(SqlValue::Decimal(n.rescale(target.scale)))
}

fn numeric_from_decimal(n: Numeric, target: &ParameterType) -> Result<SqlValue> {
    match target.sql_type {
        SqlType::Numeric | SqlType::Decimal => decimal_value(n, target),
        SqlType::Real | SqlType::Float | SqlType::Double => n.to_f64().map(SqlValue::Double),
        _ => {
            let whole = n
                .rescale(0)
                .to_i64()
                .map_err(|_| out_of_range(target, &n))?;
            check_integral_range(whole, target)
        }
    }
}

fn numeric_from_float(v: f64, target: &ParameterType) -> Result<SqlValue> {
    match target.sql_type {
        SqlType::Real | SqlType::Float | SqlType::Double => Ok(SqlValue::Double(v)),
        _ => {
            let n = Numeric::from_f64(v).map_err(|_| out_of_range(target, v))?;
            numeric_from_decimal(n, target)
        }
    }
}

fn coerce_numeric(value: Value, target: &ParameterType) -> Result<SqlValue> {
    match value {
        Value::Real(v) => numeric_from_float(v as f64, target),
        Value::Double(v) => numeric_from_float(v, target),
        Value::Decimal(n) => numeric_from_decimal(n, target),
        Value::String(s) => {
            let n = Numeric::parse(&s)
                .map_err(|_| Error::invalid_value(target.to_string(), format!("'{}' is not a number", s)))?;
            numeric_from_decimal(n, target)
        }
        other => Err(mismatch(&other, target)),
    }
}

fn character_value(s: String, target: &ParameterType) -> Result<SqlValue> {
    let length = s.chars().count() as u64;
    if !target.accepts_length(length) {
        return Err(Error::invalid_value(
            target.to_string(),
            format!("string data, right truncation: length {}", length),
        ));
    }
    Ok(SqlValue::Char(s))
}

fn binary_value(b: Bytes, target: &ParameterType) -> Result<SqlValue> {
    if !target.accepts_length(b.len() as u64) {
        return Err(Error::invalid_value(
            target.to_string(),
            format!("binary data, right truncation: length {}", b.len()),
        ));
    }
    Ok(SqlValue::Binary(b))
}

fn check_in_memory(length: Option<u64>) -> Result<()> {
    match length {
        Some(length) if length > MAX_IN_MEMORY_LENGTH => Err(Error::ValueTooLarge {
            length,
            limit: MAX_IN_MEMORY_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Decode a hexadecimal string such as `0aFF`
pub fn decode_hex(s: &str) -> Result<Bytes> {
    let s = s.trim();
    let invalid = || Error::invalid_value("VARBINARY", format!("invalid hexadecimal string '{}'", s));
    if s.len() % 2 != 0 {
        return Err(invalid());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    for pair in s.as_bytes().chunks(2) {
        let hi = (pair[0] as char).to_digit(16).ok_or_else(invalid)?;
        let lo = (pair[1] as char).to_digit(16).ok_or_else(invalid)?;
        out.push((hi * 16 + lo) as u8);
    }
    Ok(Bytes::from(out))
}

fn coerce_blob(value: Value, target: &ParameterType) -> Result<Binding> {
    match value {
        Value::Blob(blob) => Ok(Binding::Blob(blob)),
        Value::Bytes(b) => Ok(Binding::Stream(PendingStream::new(
            LobSource::from_bytes(b),
            SqlType::Blob,
        ))),
        Value::String(s) => Ok(Binding::Stream(PendingStream::new(
            LobSource::from_bytes(decode_hex(&s)?),
            SqlType::Blob,
        ))),
        Value::BinaryStream(source) => Ok(Binding::Stream(PendingStream::new(source, SqlType::Blob))),
        other => Err(Error::UnsupportedValueType(format!(
            "{} cannot be bound to {}",
            other.type_name(),
            target
        ))),
    }
}

fn coerce_clob(value: Value, target: &ParameterType) -> Result<Binding> {
    match value {
        Value::Clob(clob) => Ok(Binding::Clob(clob)),
        Value::String(s) => Ok(Binding::Stream(PendingStream::new(
            LobSource::from_text(s),
            SqlType::Clob,
        ))),
        Value::CharacterStream(source) => {
            Ok(Binding::Stream(PendingStream::new(source, SqlType::Clob)))
        }
        other => Err(Error::UnsupportedValueType(format!(
            "{} cannot be bound to {}",
            other.type_name(),
            target
        ))),
    }
}

fn coerce_binary(value: Value, target: &ParameterType) -> Result<Binding> {
    match value {
        Value::Bytes(b) => binary_value(b, target).map(Binding::Value),
        Value::String(s) => binary_value(decode_hex(&s)?, target).map(Binding::Value),
        Value::Blob(Blob::Local(b)) => {
            check_in_memory(Some(b.len() as u64))?;
            binary_value(b, target).map(Binding::Value)
        }
        Value::Blob(Blob::Remote(handle)) => {
            check_in_memory(Some(handle.length))?;
            if !target.accepts_length(handle.length) {
                return Err(Error::invalid_value(
                    target.to_string(),
                    format!("binary data, right truncation: length {}", handle.length),
                ));
            }
            Ok(Binding::MaterializeBinary(handle))
        }
        Value::BinaryStream(source) => {
            check_in_memory(source.length())?;
            Ok(Binding::Stream(PendingStream::new(source, target.sql_type)))
        }
        other => Err(mismatch(&other, target)),
    }
}

fn coerce_object(value: Value) -> Result<SqlValue> {
    let json = match value {
        Value::Object(json) => json,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::String(s) => serde_json::Value::String(s),
        Value::Real(v) => serde_json::json!(v),
        Value::Double(v) => serde_json::json!(v),
        Value::Decimal(n) => serde_json::Value::String(n.to_string()),
        other => {
            return Err(Error::UnsupportedValueType(format!(
                "{} is not serializable",
                other.type_name()
            )))
        }
    };
    serde_json::to_vec(&json)
        .map(|bytes| SqlValue::Object(Bytes::from(bytes)))
        .map_err(|e| Error::UnsupportedValueType(format!("serialization failed: {}", e)))
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Normalize a wall-clock value, optionally carrying its own offset
///
/// Zoned targets keep an offset: the caller's zone when supplied, otherwise
/// the value's own offset, otherwise the session zone. Plain targets get
/// wall-clock time in the session zone.
fn normalize(
    datetime: NaiveDateTime,
    own: Option<FixedOffset>,
    zoned: bool,
    ctx: &CoercionContext,
) -> Result<ZonedTimestamp> {
    let source = own.or(ctx.zone).unwrap_or(ctx.session_zone);
    let target = if zoned {
        ctx.zone.or(own).unwrap_or(ctx.session_zone)
    } else {
        ctx.session_zone
    };
    let shifted = if source == target {
        datetime
    } else {
        shift_zone(datetime, source, target)?
    };
    Ok(if zoned {
        ZonedTimestamp::with_offset(shifted, target)
    } else {
        ZonedTimestamp::local(shifted)
    })
}

fn coerce_temporal(value: Value, target: &ParameterType, ctx: &CoercionContext) -> Result<SqlValue> {
    let zoned = target.sql_type.is_zoned();

    // (wall clock, own offset) of the input, or a direct result for dates
    let (datetime, own) = match (&value, target.sql_type) {
        (Value::Date(d), SqlType::Date) => return Ok(SqlValue::Date(*d)),
        (Value::String(s), SqlType::Date) => {
            return parse_date(s)
                .or_else(|_| parse_timestamp(s).map(|ts| ts.datetime.date()))
                .map(SqlValue::Date)
        }
        (Value::Date(_), SqlType::Time | SqlType::TimeWithTimeZone) => {
            return Err(mismatch(&value, target))
        }
        (Value::Date(d), _) => (d.and_time(NaiveTime::MIN), None),
        (Value::Time(_), SqlType::Date | SqlType::Timestamp | SqlType::TimestampWithTimeZone) => {
            return Err(mismatch(&value, target))
        }
        (Value::Time(t), _) => (epoch_date().and_time(*t), None),
        (Value::Timestamp(ts), _) => (*ts, None),
        (Value::TimestampTz(dt), _) => (dt.naive_local(), Some(*dt.offset())),
        (Value::String(s), SqlType::Time | SqlType::TimeWithTimeZone) => {
            let t = parse_time(s)?;
            (epoch_date().and_time(t.time), t.offset)
        }
        (Value::String(s), _) => {
            let ts = parse_timestamp(s)?;
            (ts.datetime, ts.offset)
        }
        _ => return Err(mismatch(&value, target)),
    };

    let normalized = normalize(datetime, own, zoned, ctx)?;
    Ok(match target.sql_type {
        SqlType::Date => SqlValue::Date(normalized.datetime.date()),
        SqlType::Time | SqlType::TimeWithTimeZone => SqlValue::Time(ZonedTime {
            time: normalized.datetime.time(),
            offset: normalized.offset,
        }),
        _ => SqlValue::Timestamp(normalized),
    })
}

fn coerce_character(value: Value, target: &ParameterType) -> Result<Binding> {
    let text = match value {
        Value::String(s) => s,
        Value::Boolean(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Decimal(n) => n.to_string(),
        Value::Date(d) => d.to_string(),
        Value::Time(t) => ZonedTime::local(t).to_string(),
        Value::Timestamp(ts) => ZonedTimestamp::local(ts).to_string(),
        Value::TimestampTz(dt) => {
            ZonedTimestamp::with_offset(dt.naive_local(), *dt.offset()).to_string()
        }
        Value::Clob(Clob::Local(s)) => s,
        Value::Object(serde_json::Value::String(s)) => s,
        Value::Object(json) => json.to_string(),
        Value::CharacterStream(source) => {
            if source.encoding() == StreamEncoding::Binary {
                return Err(Error::UnsupportedValueType(
                    "binary stream cannot be bound to a character type".to_string(),
                ));
            }
            check_in_memory(source.length())?;
            return Ok(Binding::Stream(PendingStream::new(source, target.sql_type)));
        }
        other => return Err(mismatch(&other, target)),
    };
    character_value(text, target).map(Binding::Value)
}

fn coerce_boolean(value: Value, target: &ParameterType) -> Result<SqlValue> {
    match value {
        Value::Boolean(b) => Ok(SqlValue::Boolean(b)),
        Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Ok(SqlValue::Boolean(true)),
            "FALSE" => Ok(SqlValue::Boolean(false)),
            "UNKNOWN" => Ok(SqlValue::Null),
            _ => Err(Error::invalid_value(
                target.to_string(),
                format!("'{}' is not a boolean value", s),
            )),
        },
        other => Err(mismatch(&other, target)),
    }
}
