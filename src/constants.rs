//! Session protocol constants
//!
//! SQL type codes, parameter modes, result-set properties and the
//! SQLSTATE codes surfaced by [`crate::Error::sql_state`].

use crate::error::{Error, Result};

// =============================================================================
// SQL Types
// =============================================================================

/// Declared SQL type of a parameter or column
///
/// Discriminants follow the standard type codes used by call-level
/// database APIs, so hints passed to `set_null` can be mapped directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SqlType {
    /// BOOLEAN
    Boolean = 16,
    /// TINYINT
    TinyInt = -6,
    /// SMALLINT
    SmallInt = 5,
    /// INTEGER
    Integer = 4,
    /// BIGINT
    BigInt = -5,
    /// REAL
    Real = 7,
    /// FLOAT
    Float = 6,
    /// DOUBLE
    Double = 8,
    /// NUMERIC
    Numeric = 2,
    /// DECIMAL
    Decimal = 3,
    /// CHAR fixed-length string
    Char = 1,
    /// VARCHAR string
    VarChar = 12,
    /// BINARY fixed-length
    Binary = -2,
    /// VARBINARY
    VarBinary = -3,
    /// BLOB
    Blob = 2004,
    /// CLOB
    Clob = 2005,
    /// DATE
    Date = 91,
    /// TIME
    Time = 92,
    /// TIME WITH TIME ZONE
    TimeWithTimeZone = 2013,
    /// TIMESTAMP
    Timestamp = 93,
    /// TIMESTAMP WITH TIME ZONE
    TimestampWithTimeZone = 2014,
    /// OTHER (serialized application object)
    Other = 1111,
}

impl SqlType {
    /// Check if this is a large-object type (BLOB or CLOB)
    pub fn is_lob(&self) -> bool {
        matches!(self, SqlType::Blob | SqlType::Clob)
    }

    /// Check if this is an exact integral type
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Check if this is any numeric type
    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || matches!(
                self,
                SqlType::Real
                    | SqlType::Float
                    | SqlType::Double
                    | SqlType::Numeric
                    | SqlType::Decimal
            )
    }

    /// Check if this is a date/time type
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SqlType::Date
                | SqlType::Time
                | SqlType::TimeWithTimeZone
                | SqlType::Timestamp
                | SqlType::TimestampWithTimeZone
        )
    }

    /// Check if values of this type carry a zone offset
    pub fn is_zoned(&self) -> bool {
        matches!(self, SqlType::TimeWithTimeZone | SqlType::TimestampWithTimeZone)
    }

    /// Check if this is an in-memory binary type
    pub fn is_binary(&self) -> bool {
        matches!(self, SqlType::Binary | SqlType::VarBinary)
    }

    /// Check if this is an in-memory character type
    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Char | SqlType::VarChar)
    }

    /// SQL name of the type
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHARACTER",
            SqlType::VarChar => "VARCHAR",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Clob => "CLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::TimeWithTimeZone => "TIME WITH TIME ZONE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampWithTimeZone => "TIMESTAMP WITH TIME ZONE",
            SqlType::Other => "OTHER",
        }
    }
}

impl TryFrom<i32> for SqlType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            16 => Ok(SqlType::Boolean),
            -6 => Ok(SqlType::TinyInt),
            5 => Ok(SqlType::SmallInt),
            4 => Ok(SqlType::Integer),
            -5 => Ok(SqlType::BigInt),
            7 => Ok(SqlType::Real),
            6 => Ok(SqlType::Float),
            8 => Ok(SqlType::Double),
            2 => Ok(SqlType::Numeric),
            3 => Ok(SqlType::Decimal),
            1 => Ok(SqlType::Char),
            12 => Ok(SqlType::VarChar),
            -2 => Ok(SqlType::Binary),
            -3 => Ok(SqlType::VarBinary),
            2004 => Ok(SqlType::Blob),
            2005 => Ok(SqlType::Clob),
            91 => Ok(SqlType::Date),
            92 => Ok(SqlType::Time),
            2013 => Ok(SqlType::TimeWithTimeZone),
            93 => Ok(SqlType::Timestamp),
            2014 => Ok(SqlType::TimestampWithTimeZone),
            1111 => Ok(SqlType::Other),
            _ => Err(Error::InvalidArgument(format!("unknown SQL type code: {}", value))),
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Parameter Modes
// =============================================================================

/// Direction of a statement parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    /// Mode not reported by the engine (treated as settable and readable)
    Unknown,
    /// Input only parameter - default
    #[default]
    In,
    /// Input/Output parameter
    InOut,
    /// Output only parameter
    Out,
}

impl ParameterMode {
    /// Check if the client may set this parameter
    pub fn is_settable(&self) -> bool {
        !matches!(self, ParameterMode::Out)
    }

    /// Check if the client may read this parameter as an output
    pub fn is_readable(&self) -> bool {
        !matches!(self, ParameterMode::In)
    }
}

// =============================================================================
// Result Set Properties
// =============================================================================

/// Result-set scrollability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    /// Cursor may only move forward - default
    #[default]
    ForwardOnly,
    /// Scrollable, not sensitive to concurrent changes
    ScrollInsensitive,
    /// Scrollable and sensitive to concurrent changes (downgraded to insensitive)
    ScrollSensitive,
}

impl ResultSetType {
    /// Check if the cursor supports non-forward movement
    pub fn is_scrollable(&self) -> bool {
        !matches!(self, ResultSetType::ForwardOnly)
    }
}

/// Result-set concurrency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// Read-only results - default
    #[default]
    ReadOnly,
    /// Updatable results (downgraded to read-only)
    Updatable,
}

/// Result-set holdability across commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Holdability {
    /// Results remain open after commit - default
    #[default]
    HoldOverCommit,
    /// Results are closed at commit
    CloseAtCommit,
}

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted
    ReadUncommitted,
    /// Read committed - default
    #[default]
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    /// Returns the SQL representation
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Cursor movement on a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchOrientation {
    /// Next row (default)
    #[default]
    Next,
    /// Previous row
    Prior,
    /// First row
    First,
    /// Last row
    Last,
    /// Absolute position; negative counts back from the end
    Absolute,
    /// Relative to the current position
    Relative,
}

/// Kind of result a prepared statement produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementReturnType {
    /// Statement produces rows
    Rows,
    /// Statement produces an update count
    Count,
}

impl StatementReturnType {
    /// Human readable description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            StatementReturnType::Rows => "rows",
            StatementReturnType::Count => "update count",
        }
    }
}

/// Execution mode of an execute request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One execution with the current parameter values
    #[default]
    Single,
    /// One execution per accumulated batch entry
    Batch,
    /// Update of a result row through a result-bound statement
    UpdateResult,
}

// =============================================================================
// Savepoints
// =============================================================================

/// Prefix reserved for system-generated savepoint names
pub const SYSTEM_SAVEPOINT_PREFIX: &str = "SYSTEM_SAVEPOINT";

// =============================================================================
// Limits
// =============================================================================

/// Largest LOB that can be converted to an in-memory binary value
pub const MAX_IN_MEMORY_LENGTH: u64 = i32::MAX as u64;

// =============================================================================
// SQLSTATE Codes
// =============================================================================

/// SQLSTATE codes reported by locally detected errors
pub mod sql_state {
    /// Connection does not exist (closed)
    pub const CONNECTION_DOES_NOT_EXIST: &str = "08003";
    /// Unable to establish connection
    pub const UNABLE_TO_CONNECT: &str = "08001";
    /// Parameter not set
    pub const PARAMETER_NOT_SET: &str = "07001";
    /// Statement returns an update count, not a result set
    pub const RETURNS_UPDATE_COUNT: &str = "07503";
    /// Statement returns a result set, not an update count
    pub const RETURNS_RESULT_SET: &str = "07504";
    /// Invalid descriptor index
    pub const INVALID_DESCRIPTOR_INDEX: &str = "07009";
    /// Data exception
    pub const DATA_EXCEPTION: &str = "22000";
    /// String data, right truncation
    pub const STRING_RIGHT_TRUNCATION: &str = "22001";
    /// Numeric value out of range
    pub const NUMERIC_OUT_OF_RANGE: &str = "22003";
    /// Invalid savepoint specification
    pub const INVALID_SAVEPOINT: &str = "3B001";
    /// Syntax error or access rule violation
    pub const SYNTAX_ERROR: &str = "42000";
    /// Incompatible data type in conversion
    pub const DATA_TYPE_MISMATCH: &str = "42565";
    /// Feature not supported
    pub const FEATURE_NOT_SUPPORTED: &str = "0A000";
    /// Function sequence error
    pub const FUNCTION_SEQUENCE_ERROR: &str = "HY010";
    /// Invalid attribute value
    pub const INVALID_ATTRIBUTE_VALUE: &str = "HY024";
    /// Invalid parameter type
    pub const INVALID_PARAMETER_TYPE: &str = "HY105";
    /// General error
    pub const GENERAL_ERROR: &str = "HY000";
    /// Warning: option value changed
    pub const OPTION_VALUE_CHANGED: &str = "01S02";
}
