//! Engine request and response objects
//!
//! Every interaction with the engine is one [`Request`] answered by one
//! [`Response`]. A response carries exactly one outcome: a prepared
//! descriptor, rows, an update count, batch counts, an error, or a plain
//! acknowledgement.
//!
//! The [`RequestBuilder`] owned by each prepared statement assembles
//! execute and batch requests, keeps the pending batch rows and collects the
//! LOB creation sub-requests produced by staging.

use crate::batch::{BatchBuffer, BatchOutcome};
use crate::constants::{Concurrency, ExecutionMode, Holdability, ResultSetType, StatementReturnType};
use crate::error::{Error, Result};
use crate::metadata::{ColumnInfo, ParameterInfo};
use crate::params::Binding;
use crate::row::RowSet;
use crate::types::{LobData, LobHandle, SqlValue};

// =============================================================================
// Requests
// =============================================================================

/// Content for a LOB allocated during staging, written before execution
#[derive(Debug, Clone, PartialEq)]
pub struct LobCreate {
    /// Handle returned by the engine's allocation
    pub handle: LobHandle,
    /// Content to store
    pub data: LobData,
}

/// Generated-key reporting requested at prepare time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratedKeys {
    /// No generated keys
    #[default]
    None,
    /// All generated columns
    All,
    /// Columns by 1-based index
    Indexes(Vec<usize>),
    /// Columns by name
    Names(Vec<String>),
}

/// Prepare a statement
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareRequest {
    /// SQL text after escape normalization
    pub sql: String,
    /// Requested scrollability
    pub result_set_type: ResultSetType,
    /// Requested concurrency
    pub concurrency: Concurrency,
    /// Requested holdability
    pub holdability: Holdability,
    /// Generated-key reporting mode
    pub generated_keys: GeneratedKeys,
}

/// Execute a prepared statement once
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    /// Engine statement id
    pub statement_id: i64,
    /// Execution mode
    pub mode: ExecutionMode,
    /// Coerced parameter values in order
    pub parameters: Vec<SqlValue>,
    /// Row cap, 0 for none
    pub max_rows: u64,
    /// Fetch size hint, 0 for the engine default
    pub fetch_size: u32,
    /// LOBs to create before execution
    pub lobs: Vec<LobCreate>,
}

/// Execute a prepared statement once per batch entry
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Engine statement id
    pub statement_id: i64,
    /// Coerced parameter values of each entry
    pub rows: Vec<Vec<SqlValue>>,
    /// LOBs to create before execution
    pub lobs: Vec<LobCreate>,
}

/// Request sent to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Prepare SQL text
    Prepare(PrepareRequest),
    /// Execute once
    Execute(ExecuteRequest),
    /// Execute a batch
    ExecuteBatch(BatchRequest),
    /// Release a prepared statement
    FreeStatement {
        /// Engine statement id
        statement_id: i64,
    },
    /// Liveness probe
    Ping,
}

impl Request {
    /// Short name of the request kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Prepare(_) => "prepare",
            Request::Execute(_) => "execute",
            Request::ExecuteBatch(_) => "execute_batch",
            Request::FreeStatement { .. } => "free_statement",
            Request::Ping => "ping",
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Error reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    /// Engine error code
    pub code: i32,
    /// SQLSTATE
    pub sql_state: String,
    /// Message
    pub message: String,
}

impl EngineFailure {
    /// Create a failure
    pub fn new(code: i32, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }
}

impl From<EngineFailure> for Error {
    fn from(f: EngineFailure) -> Self {
        Error::Engine {
            code: f.code,
            sql_state: f.sql_state,
            message: f.message,
        }
    }
}

/// Result of a statement that returns an update count
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Rows affected
    pub count: u64,
    /// Generated keys, when requested at prepare time
    pub generated_keys: Option<RowSet>,
    /// One value per parameter in parameter order; NULL for IN parameters
    pub output_parameters: Vec<SqlValue>,
}

impl UpdateResult {
    /// Result with only a count
    pub fn count(count: u64) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }
}

/// Description of a prepared statement returned by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDescriptor {
    /// Engine statement id
    pub statement_id: i64,
    /// Whether the statement returns rows or a count
    pub return_type: StatementReturnType,
    /// Result columns (empty for count statements)
    pub result_columns: Vec<ColumnInfo>,
    /// Parameters in order
    pub parameters: Vec<ParameterInfo>,
    /// Granted scrollability
    pub result_set_type: ResultSetType,
    /// Granted concurrency
    pub concurrency: Concurrency,
    /// Granted holdability
    pub holdability: Holdability,
}

impl PreparedDescriptor {
    /// Descriptor for a statement returning rows, with default result properties
    pub fn rows(statement_id: i64, columns: Vec<ColumnInfo>, parameters: Vec<ParameterInfo>) -> Self {
        Self {
            statement_id,
            return_type: StatementReturnType::Rows,
            result_columns: columns,
            parameters,
            result_set_type: ResultSetType::default(),
            concurrency: Concurrency::default(),
            holdability: Holdability::default(),
        }
    }

    /// Descriptor for a statement returning an update count
    pub fn count(statement_id: i64, parameters: Vec<ParameterInfo>) -> Self {
        Self {
            return_type: StatementReturnType::Count,
            ..Self::rows(statement_id, Vec::new(), parameters)
        }
    }
}

/// Response from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Statement prepared
    Prepared(PreparedDescriptor),
    /// Tabular result
    Rows(RowSet),
    /// Update count
    UpdateCount(UpdateResult),
    /// Batch update counts
    BatchCounts(BatchOutcome),
    /// Error
    Error(EngineFailure),
    /// Acknowledgement
    Ok,
}

impl Response {
    /// Error response
    pub fn error(code: i32, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(EngineFailure::new(code, sql_state, message))
    }

    /// Short name of the response kind
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Prepared(_) => "prepared",
            Response::Rows(_) => "rows",
            Response::UpdateCount(_) => "update count",
            Response::BatchCounts(_) => "batch counts",
            Response::Error(_) => "error",
            Response::Ok => "ok",
        }
    }

    /// Turn an error response into an `Engine` error
    pub fn into_result(self) -> Result<Response> {
        match self {
            Response::Error(failure) => Err(failure.into()),
            other => Ok(other),
        }
    }
}

/// Error for a response of an unexpected kind
pub(crate) fn unexpected(response: &Response, request: &str) -> Error {
    Error::Internal(format!(
        "unexpected {} response to {} request",
        response.kind(),
        request
    ))
}

// =============================================================================
// Request builder
// =============================================================================

/// Assembles the requests of one prepared statement
#[derive(Debug)]
pub struct RequestBuilder {
    statement_id: i64,
    max_rows: u64,
    fetch_size: u32,
    batch: BatchBuffer,
    lobs: Vec<LobCreate>,
}

impl RequestBuilder {
    /// Create a builder for a statement with `parameter_count` parameters
    pub fn new(statement_id: i64, parameter_count: usize) -> Self {
        Self {
            statement_id,
            max_rows: 0,
            fetch_size: 0,
            batch: BatchBuffer::new(parameter_count),
            lobs: Vec::new(),
        }
    }

    /// Build a prepare request
    pub fn prepare(
        sql: impl Into<String>,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
        holdability: Holdability,
        generated_keys: GeneratedKeys,
    ) -> Request {
        Request::Prepare(PrepareRequest {
            sql: sql.into(),
            result_set_type,
            concurrency,
            holdability,
            generated_keys,
        })
    }

    /// Engine statement id
    pub fn statement_id(&self) -> i64 {
        self.statement_id
    }

    /// Set the row cap, 0 for none
    pub fn set_max_rows(&mut self, max_rows: u64) {
        self.max_rows = max_rows;
    }

    /// Row cap
    pub fn max_rows(&self) -> u64 {
        self.max_rows
    }

    /// Set the fetch size hint
    pub fn set_fetch_size(&mut self, fetch_size: u32) {
        self.fetch_size = fetch_size;
    }

    /// Fetch size hint
    pub fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    /// Check if batch rows are accumulating
    pub fn is_batching(&self) -> bool {
        self.batch.is_active()
    }

    /// Number of pending batch rows
    pub fn batch_len(&self) -> usize {
        self.batch.row_count()
    }

    /// Append a batch row, switching to batch accumulation on the first call
    pub fn add_batch_row(&mut self, row: Vec<Binding>) -> Result<()> {
        self.batch.add_row(row)
    }

    /// Take the pending batch rows and leave batch accumulation
    pub fn take_batch(&mut self) -> Vec<Vec<Binding>> {
        self.batch.take()
    }

    /// Drop pending batch rows and leave batch accumulation
    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Attach LOB creation sub-requests to the next request
    pub fn attach_lobs(&mut self, lobs: Vec<LobCreate>) {
        self.lobs.extend(lobs);
    }

    /// Drop attached LOB sub-requests that were never sent
    pub fn discard_lobs(&mut self) {
        self.lobs.clear();
    }

    /// Build a single execute request with the attached LOBs
    pub fn execute(&mut self, parameters: Vec<SqlValue>) -> Request {
        Request::Execute(ExecuteRequest {
            statement_id: self.statement_id,
            mode: ExecutionMode::Single,
            parameters,
            max_rows: self.max_rows,
            fetch_size: self.fetch_size,
            lobs: std::mem::take(&mut self.lobs),
        })
    }

    /// Build a batch request with the attached LOBs
    pub fn execute_batch(&mut self, rows: Vec<Vec<SqlValue>>) -> Request {
        Request::ExecuteBatch(BatchRequest {
            statement_id: self.statement_id,
            rows,
            lobs: std::mem::take(&mut self.lobs),
        })
    }

    /// Build a free-statement request
    pub fn free(&self) -> Request {
        Request::FreeStatement {
            statement_id: self.statement_id,
        }
    }
}
