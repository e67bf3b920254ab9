//! DATE, TIME and TIMESTAMP values
//!
//! Temporal parameters are normalized to a zone-relative representation:
//! a wall-clock value plus an optional UTC offset. Zone-aware column types
//! always carry an offset; plain columns carry wall-clock time in the
//! session zone.
//!
//! Accepted string forms:
//! - DATE: `YYYY-MM-DD`
//! - TIME: `HH:MM:SS[.fraction][+HH:MM]`
//! - TIMESTAMP: `YYYY-MM-DD[ T]HH:MM:SS[.fraction][+HH:MM]` or a bare date

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{Error, Result};

/// Time of day with an optional zone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZonedTime {
    /// Wall-clock time
    pub time: NaiveTime,
    /// Zone offset, present for TIME WITH TIME ZONE
    pub offset: Option<FixedOffset>,
}

impl ZonedTime {
    /// Create a time without zone
    pub fn local(time: NaiveTime) -> Self {
        Self { time, offset: None }
    }

    /// Create a time in the given zone
    pub fn with_offset(time: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            time,
            offset: Some(offset),
        }
    }

    /// Check if the value carries an offset
    pub fn has_timezone(&self) -> bool {
        self.offset.is_some()
    }
}

/// Timestamp with an optional zone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZonedTimestamp {
    /// Wall-clock date and time
    pub datetime: NaiveDateTime,
    /// Zone offset, present for TIMESTAMP WITH TIME ZONE
    pub offset: Option<FixedOffset>,
}

impl ZonedTimestamp {
    /// Create a timestamp without zone
    pub fn local(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            offset: None,
        }
    }

    /// Create a timestamp in the given zone
    pub fn with_offset(datetime: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            datetime,
            offset: Some(offset),
        }
    }

    /// Check if the value carries an offset
    pub fn has_timezone(&self) -> bool {
        self.offset.is_some()
    }

    /// Convert to an absolute instant when the offset is known
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset?;
        offset.from_local_datetime(&self.datetime).single()
    }
}

/// Re-express a wall-clock value observed in `from` as wall-clock in `to`
pub fn shift_zone(
    datetime: NaiveDateTime,
    from: FixedOffset,
    to: FixedOffset,
) -> Result<NaiveDateTime> {
    from.from_local_datetime(&datetime)
        .single()
        .map(|dt| dt.with_timezone(&to).naive_local())
        .ok_or_else(|| {
            Error::invalid_value("TIMESTAMP", format!("{} has no instant in zone {}", datetime, from))
        })
}

/// Parse a zone offset such as `+02:00`, `-0530` or `Z`
pub fn parse_offset(text: &str) -> Result<FixedOffset> {
    let invalid = || Error::invalid_value("TIME ZONE", format!("invalid zone offset '{}'", text));
    if text == "Z" || text == "z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 2 && digits.len() != 4 {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| invalid())?
    } else {
        0
    };
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Split a trailing zone offset off a time or timestamp string
fn split_offset(text: &str, time_start: usize) -> (&str, Option<&str>) {
    if let Some(stripped) = text.strip_suffix(['Z', 'z']) {
        return (stripped, Some(&text[text.len() - 1..]));
    }
    let tail = &text[time_start..];
    match tail.rfind(['+', '-']) {
        Some(pos) => {
            let split = time_start + pos;
            (text[..split].trim_end(), Some(&text[split..]))
        }
        None => (text, None),
    }
}

/// Parse a DATE string
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| Error::invalid_value("DATE", format!("'{}': {}", text, e)))
}

/// Parse a TIME string with an optional zone offset
pub fn parse_time(text: &str) -> Result<ZonedTime> {
    let trimmed = text.trim();
    let (body, offset) = split_offset(trimmed, 0);
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|e| Error::invalid_value("TIME", format!("'{}': {}", text, e)))?;
    Ok(ZonedTime {
        time,
        offset: offset.map(parse_offset).transpose()?,
    })
}

/// Parse a TIMESTAMP string with an optional zone offset
pub fn parse_timestamp(text: &str) -> Result<ZonedTimestamp> {
    let trimmed = text.trim();
    if trimmed.len() == 10 {
        let date = parse_date(trimmed)?;
        return Ok(ZonedTimestamp::local(date.and_time(NaiveTime::MIN)));
    }

    // The zone offset can only follow the time part, which starts after the date
    let time_start = trimmed.len().min(11);
    let (body, offset) = split_offset(trimmed, time_start);
    let datetime = NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| Error::invalid_value("TIMESTAMP", format!("'{}': {}", text, e)))?;
    Ok(ZonedTimestamp {
        datetime,
        offset: offset.map(parse_offset).transpose()?,
    })
}

impl std::fmt::Display for ZonedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.time.format("%H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            write!(f, "{}", offset)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ZonedTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            write!(f, "{}", offset)?;
        }
        Ok(())
    }
}
