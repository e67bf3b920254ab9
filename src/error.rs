//! Error types for the session layer
//!
//! This module defines every error a connection or prepared statement can
//! surface, from local argument validation (raised before any engine round
//! trip) to errors reported verbatim by the engine.

use std::io;
use thiserror::Error;

use crate::constants::{sql_state, ParameterMode};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the session layer
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Operation attempted on a closed connection
    #[error("session closed")]
    SessionClosed,

    /// Operation attempted on a closed statement
    #[error("statement closed")]
    StatementClosed,

    /// Operation not valid in the current statement state
    #[error("invalid state: {0}")]
    InvalidState(String),

    // =========================================================================
    // Parameter Errors
    // =========================================================================
    /// Parameter or column index outside `[1, count]`
    #[error("index out of range: {index} (valid range 1..={count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Setting an OUT parameter or reading an IN parameter as output
    #[error("parameter {index} has mode {mode:?}: {message}")]
    ParameterModeViolation {
        index: usize,
        mode: ParameterMode,
        message: String,
    },

    /// Execution attempted with an unset IN/INOUT parameter
    #[error("parameter {index} not set")]
    ParameterNotSet { index: usize },

    // =========================================================================
    // Coercion Errors
    // =========================================================================
    /// Value cannot be converted to the declared parameter type
    #[error("invalid value for {target}: {message}")]
    InvalidValueForType { target: String, message: String },

    /// Value type is not accepted at all by the declared parameter type
    #[error("unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// Value exceeds what can be held in memory for the declared type
    #[error("value too large: {length} exceeds limit {limit}")]
    ValueTooLarge { length: u64, limit: u64 },

    /// Stream content length differs from the declared length
    #[error("stream length mismatch for parameter {index}: declared {declared}, actual {actual}")]
    StreamLengthMismatch {
        index: usize,
        declared: u64,
        actual: u64,
    },

    // =========================================================================
    // SQL Text Errors
    // =========================================================================
    /// Unrecognized `{...}` escape introducer
    #[error("malformed escape sequence at offset {offset}: {text}")]
    MalformedEscapeSequence { offset: usize, text: String },

    // =========================================================================
    // Execution Errors
    // =========================================================================
    /// Error response returned by the engine, carried verbatim
    #[error("engine error {code} ({sql_state}): {message}")]
    Engine {
        code: i32,
        sql_state: String,
        message: String,
    },

    /// Batch stopped before every entry was executed
    #[error("batch failure after {} of {expected} entries: {message}", counts.len())]
    BatchFailure {
        counts: Vec<u64>,
        expected: usize,
        code: Option<i32>,
        sql_state: Option<String>,
        message: String,
    },

    /// Wrong execute accessor for the statement's result kind
    #[error("wrong result shape: statement returns {actual}, caller expected {expected}")]
    WrongResultShape {
        expected: &'static str,
        actual: &'static str,
    },

    /// Savepoint handle is foreign, invalidated, or used under auto-commit
    #[error("invalid savepoint: {0}")]
    InvalidSavepoint(String),

    // =========================================================================
    // Argument and Feature Errors
    // =========================================================================
    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Capability not implemented by this layer
    #[error("feature not supported: {0}")]
    Unsupported(String),

    /// Invalid connection string
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Local stream or reader failure while staging data
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new engine error
    pub fn engine(code: i32, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Engine {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }

    /// Create a coercion error for the given target type name
    pub fn invalid_value(target: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidValueForType {
            target: target.into(),
            message: message.into(),
        }
    }

    /// SQLSTATE-style code for this error
    pub fn sql_state(&self) -> &str {
        match self {
            Error::SessionClosed => sql_state::CONNECTION_DOES_NOT_EXIST,
            Error::StatementClosed | Error::InvalidState(_) => sql_state::FUNCTION_SEQUENCE_ERROR,
            Error::IndexOutOfRange { .. } => sql_state::INVALID_DESCRIPTOR_INDEX,
            Error::ParameterModeViolation { .. } => sql_state::INVALID_PARAMETER_TYPE,
            Error::ParameterNotSet { .. } => sql_state::PARAMETER_NOT_SET,
            Error::InvalidValueForType { .. } | Error::UnsupportedValueType(_) => {
                sql_state::DATA_TYPE_MISMATCH
            }
            Error::ValueTooLarge { .. } => sql_state::STRING_RIGHT_TRUNCATION,
            Error::StreamLengthMismatch { .. } => sql_state::DATA_EXCEPTION,
            Error::MalformedEscapeSequence { .. } => sql_state::SYNTAX_ERROR,
            Error::Engine { sql_state, .. } => sql_state,
            Error::BatchFailure { sql_state, .. } => {
                sql_state.as_deref().unwrap_or(sql_state::GENERAL_ERROR)
            }
            Error::WrongResultShape { actual, .. } => {
                if *actual == "rows" {
                    sql_state::RETURNS_RESULT_SET
                } else {
                    sql_state::RETURNS_UPDATE_COUNT
                }
            }
            Error::InvalidSavepoint(_) => sql_state::INVALID_SAVEPOINT,
            Error::InvalidArgument(_) => sql_state::INVALID_ATTRIBUTE_VALUE,
            Error::Unsupported(_) => sql_state::FEATURE_NOT_SUPPORTED,
            Error::InvalidConnectionString(_) => sql_state::UNABLE_TO_CONNECT,
            Error::Io(_) | Error::Internal(_) => sql_state::GENERAL_ERROR,
        }
    }

    /// Check if this error was detected locally, before any engine round trip
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            Error::Engine { .. } | Error::BatchFailure { .. } | Error::Io(_)
        )
    }

    /// Check if the engine declared this failure transient
    ///
    /// Only engine-reported transaction rollbacks (SQLSTATE class `40`)
    /// qualify. Nothing is retried by this layer itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Engine { sql_state, .. } => sql_state.starts_with("40"),
            _ => false,
        }
    }

    /// Check if this error means the connection can no longer be used
    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::SessionClosed)
    }

    /// Partial update counts carried by a batch failure
    pub fn batch_counts(&self) -> Option<&[u64]> {
        match self {
            Error::BatchFailure { counts, .. } => Some(counts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = Error::engine(-5501, "42501", "user lacks privilege or object not found: T");
        assert_eq!(
            err.to_string(),
            "engine error -5501 (42501): user lacks privilege or object not found: T"
        );
        assert_eq!(err.sql_state(), "42501");
        assert!(!err.is_local());
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = Error::IndexOutOfRange { index: 3, count: 2 };
        assert_eq!(err.to_string(), "index out of range: 3 (valid range 1..=2)");
        assert_eq!(err.sql_state(), sql_state::INVALID_DESCRIPTOR_INDEX);
        assert!(err.is_local());
    }

    #[test]
    fn test_batch_failure_counts() {
        let err = Error::BatchFailure {
            counts: vec![1, 1],
            expected: 3,
            code: Some(-104),
            sql_state: Some("23505".to_string()),
            message: "unique constraint violation".to_string(),
        };
        assert_eq!(err.batch_counts(), Some(&[1u64, 1][..]));
        assert_eq!(err.sql_state(), "23505");
        assert!(err.to_string().starts_with("batch failure after 2 of 3 entries"));
        assert!(Error::SessionClosed.batch_counts().is_none());
    }

    #[test]
    fn test_wrong_result_shape_state() {
        let rows = Error::WrongResultShape {
            expected: "update count",
            actual: "rows",
        };
        let count = Error::WrongResultShape {
            expected: "rows",
            actual: "update count",
        };
        assert_eq!(rows.sql_state(), sql_state::RETURNS_RESULT_SET);
        assert_eq!(count.sql_state(), sql_state::RETURNS_UPDATE_COUNT);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::engine(-4861, "40001", "serialization failure").is_retryable());
        assert!(!Error::engine(-104, "23505", "unique constraint").is_retryable());
        assert!(!Error::SessionClosed.is_retryable());
    }

    #[test]
    fn test_is_session_error() {
        assert!(Error::SessionClosed.is_session_error());
        assert!(!Error::StatementClosed.is_session_error());
    }
}
