//! Prepared statement execution
//!
//! A [`PreparedStatement`] owns the parameter slots, the batch buffer and the
//! last result of one engine statement. Execution stages stream and LOB
//! parameters first, then sends a single execute or batch request.
//!
//! Locks are always taken statement first, connection second.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tracing::trace;

use crate::batch::BatchOutcome;
use crate::coerce::{coerce, CoercionContext};
use crate::connection::ConnectionShared;
use crate::constants::{Concurrency, Holdability, ResultSetType, SqlType, StatementReturnType};
use crate::cursor::ResultSet;
use crate::error::{Error, Result};
use crate::lob::LobStager;
use crate::metadata::{ColumnInfo, ParameterInfo, ParameterMetaData, ResultSetMetaData};
use crate::params::ParameterSet;
use crate::request::{unexpected, PreparedDescriptor, RequestBuilder, Response, UpdateResult};
use crate::row::RowSet;
use crate::types::{Blob, Clob, LobSource, Numeric, SqlValue, StreamEncoding};
use crate::value::Value;

/// Result of the last execution
#[derive(Debug)]
enum StatementResult {
    Rows(RowSet),
    Update(UpdateResult),
}

#[derive(Debug)]
struct StatementInner {
    params: ParameterSet,
    builder: RequestBuilder,
    result: Option<StatementResult>,
}

/// A statement prepared on a connection
///
/// Parameters are 1-based. Plain values stay bound across executions;
/// streams are consumed by each execution and must be set again.
///
/// # Example
///
/// ```rust,ignore
/// let stmt = conn.prepare_statement("INSERT INTO T VALUES (?, ?)").await?;
/// stmt.set_i32(1, 1).await?;
/// stmt.set_string(2, "one").await?;
/// stmt.add_batch().await?;
/// stmt.set_i32(1, 2).await?;
/// stmt.set_string(2, "two").await?;
/// stmt.add_batch().await?;
/// let counts = stmt.execute_batch().await?;
/// assert_eq!(counts, vec![1, 1]);
/// ```
pub struct PreparedStatement {
    conn: Arc<ConnectionShared>,
    sql: String,
    statement_id: i64,
    return_type: StatementReturnType,
    result_set_type: ResultSetType,
    concurrency: Concurrency,
    holdability: Holdability,
    result_columns: Vec<ColumnInfo>,
    parameters: Vec<ParameterInfo>,
    metadata: OnceLock<Arc<ResultSetMetaData>>,
    parameter_metadata: OnceLock<Arc<ParameterMetaData>>,
    closed: AtomicBool,
    inner: Mutex<StatementInner>,
}

impl PreparedStatement {
    pub(crate) fn new(conn: Arc<ConnectionShared>, sql: String, descriptor: PreparedDescriptor) -> Self {
        let mut builder = RequestBuilder::new(descriptor.statement_id, descriptor.parameters.len());
        builder.set_max_rows(conn.config().max_rows);
        builder.set_fetch_size(conn.config().fetch_size);

        Self {
            sql,
            statement_id: descriptor.statement_id,
            return_type: descriptor.return_type,
            result_set_type: descriptor.result_set_type,
            concurrency: descriptor.concurrency,
            holdability: descriptor.holdability,
            inner: Mutex::new(StatementInner {
                params: ParameterSet::new(&descriptor.parameters),
                builder,
                result: None,
            }),
            result_columns: descriptor.result_columns,
            parameters: descriptor.parameters,
            metadata: OnceLock::new(),
            parameter_metadata: OnceLock::new(),
            closed: AtomicBool::new(false),
            conn,
        }
    }

    /// SQL text as supplied by the caller
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Engine statement id
    pub fn statement_id(&self) -> i64 {
        self.statement_id
    }

    /// Whether the statement returns rows or an update count
    pub fn return_type(&self) -> StatementReturnType {
        self.return_type
    }

    /// Scrollability granted by the engine
    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    /// Concurrency granted by the engine
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Holdability granted by the engine
    pub fn holdability(&self) -> Holdability {
        self.holdability
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Check if the statement is closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::StatementClosed);
        }
        if self.conn.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Result column descriptors; `None` for statements returning a count
    pub fn metadata(&self) -> Result<Option<Arc<ResultSetMetaData>>> {
        self.check_open()?;
        if self.return_type != StatementReturnType::Rows {
            return Ok(None);
        }
        Ok(Some(Arc::clone(self.result_metadata())))
    }

    fn result_metadata(&self) -> &Arc<ResultSetMetaData> {
        self.metadata
            .get_or_init(|| Arc::new(ResultSetMetaData::new(self.result_columns.clone())))
    }

    /// Parameter descriptors
    pub fn parameter_metadata(&self) -> Result<Arc<ParameterMetaData>> {
        self.check_open()?;
        Ok(Arc::clone(self.cached_parameter_metadata()))
    }

    fn cached_parameter_metadata(&self) -> &Arc<ParameterMetaData> {
        self.parameter_metadata
            .get_or_init(|| Arc::new(ParameterMetaData::new(self.parameters.clone())))
    }

    /// 1-based index of a named parameter
    pub fn find_parameter_index(&self, name: &str) -> Result<usize> {
        self.check_open()?;
        self.cached_parameter_metadata()
            .find_parameter(name)
            .ok_or_else(|| Error::InvalidArgument(format!("parameter not found: {}", name)))
    }

    // =========================================================================
    // Parameter Binding
    // =========================================================================

    /// Bind a value, converting temporal values with `zone` when given and
    /// the session zone otherwise
    ///
    /// The index is checked before anything else, so an out-of-range index
    /// fails the same way on open and closed statements.
    pub async fn bind(&self, index: usize, value: Value, zone: Option<FixedOffset>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let pos = inner.params.check_set_index(index)?;
        self.check_open()?;

        let target = *inner
            .params
            .param_type(pos)
            .ok_or_else(|| Error::Internal(format!("no type for parameter {}", index)))?;
        let ctx = CoercionContext::new(self.conn.session_zone()).with_zone(zone);
        let kind = value.type_name();
        let binding = coerce(value, &target, &ctx)?;

        trace!(
            statement_id = self.statement_id,
            index = index,
            value_type = kind,
            sql_type = ?target.sql_type,
            "parameter bound"
        );
        inner.params.bind(pos, binding);
        Ok(())
    }

    /// Bind any value convertible to [`Value`]
    pub async fn set_parameter(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.bind(index, value.into(), None).await
    }

    /// Bind a value, interpreting temporal values in `zone`
    pub async fn set_parameter_in_zone(
        &self,
        index: usize,
        value: impl Into<Value>,
        zone: FixedOffset,
    ) -> Result<()> {
        self.bind(index, value.into(), Some(zone)).await
    }

    /// Bind a value to a named parameter
    pub async fn set_parameter_by_name(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.find_parameter_index(name)?;
        self.bind(index, value.into(), None).await
    }

    /// Bind SQL NULL
    pub async fn set_null(&self, index: usize) -> Result<()> {
        self.bind(index, Value::Null, None).await
    }

    /// Bind a boolean
    pub async fn set_bool(&self, index: usize, value: bool) -> Result<()> {
        self.bind(index, Value::Boolean(value), None).await
    }

    /// Bind an 8-bit integer
    pub async fn set_i8(&self, index: usize, value: i8) -> Result<()> {
        self.bind(index, Value::TinyInt(value), None).await
    }

    /// Bind a 16-bit integer
    pub async fn set_i16(&self, index: usize, value: i16) -> Result<()> {
        self.bind(index, Value::SmallInt(value), None).await
    }

    /// Bind a 32-bit integer
    pub async fn set_i32(&self, index: usize, value: i32) -> Result<()> {
        self.bind(index, Value::Integer(value), None).await
    }

    /// Bind a 64-bit integer
    pub async fn set_i64(&self, index: usize, value: i64) -> Result<()> {
        self.bind(index, Value::BigInt(value), None).await
    }

    /// Bind a 32-bit float
    pub async fn set_f32(&self, index: usize, value: f32) -> Result<()> {
        self.bind(index, Value::Real(value), None).await
    }

    /// Bind a 64-bit float
    pub async fn set_f64(&self, index: usize, value: f64) -> Result<()> {
        self.bind(index, Value::Double(value), None).await
    }

    /// Bind an exact decimal
    pub async fn set_decimal(&self, index: usize, value: Numeric) -> Result<()> {
        self.bind(index, Value::Decimal(value), None).await
    }

    /// Bind a string
    pub async fn set_string(&self, index: usize, value: impl Into<String>) -> Result<()> {
        self.bind(index, Value::String(value.into()), None).await
    }

    /// Bind a byte sequence
    pub async fn set_bytes(&self, index: usize, value: impl Into<Bytes>) -> Result<()> {
        self.bind(index, Value::Bytes(value.into()), None).await
    }

    /// Bind a date, interpreted in `zone` or the session zone
    pub async fn set_date(&self, index: usize, value: NaiveDate, zone: Option<FixedOffset>) -> Result<()> {
        self.bind(index, Value::Date(value), zone).await
    }

    /// Bind a time of day, interpreted in `zone` or the session zone
    pub async fn set_time(&self, index: usize, value: NaiveTime, zone: Option<FixedOffset>) -> Result<()> {
        self.bind(index, Value::Time(value), zone).await
    }

    /// Bind a timestamp, interpreted in `zone` or the session zone
    pub async fn set_timestamp(
        &self,
        index: usize,
        value: NaiveDateTime,
        zone: Option<FixedOffset>,
    ) -> Result<()> {
        self.bind(index, Value::Timestamp(value), zone).await
    }

    /// Bind a timestamp carrying its own offset
    pub async fn set_timestamp_tz(&self, index: usize, value: DateTime<FixedOffset>) -> Result<()> {
        self.bind(index, Value::TimestampTz(value), None).await
    }

    /// Bind a BLOB
    pub async fn set_blob(&self, index: usize, value: Blob) -> Result<()> {
        self.bind(index, Value::Blob(value), None).await
    }

    /// Bind a CLOB
    pub async fn set_clob(&self, index: usize, value: Clob) -> Result<()> {
        self.bind(index, Value::Clob(value), None).await
    }

    /// Bind a binary stream of `length` bytes, or up to its end when `None`
    pub async fn set_binary_stream<R>(&self, index: usize, reader: R, length: Option<u64>) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let source = stream_source(reader, StreamEncoding::Binary, length);
        self.bind(index, Value::BinaryStream(source), None).await
    }

    /// Bind a stream of single-byte characters
    pub async fn set_ascii_stream<R>(&self, index: usize, reader: R, length: Option<u64>) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let source = stream_source(reader, StreamEncoding::Ascii, length);
        self.bind(index, Value::CharacterStream(source), None).await
    }

    /// Bind a UTF-8 character stream of `length` characters
    pub async fn set_character_stream<R>(&self, index: usize, reader: R, length: Option<u64>) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let source = stream_source(reader, StreamEncoding::Utf8, length);
        self.bind(index, Value::CharacterStream(source), None).await
    }

    /// Bind a serializable object to an OTHER parameter
    pub async fn set_object<T: Serialize>(&self, index: usize, value: &T) -> Result<()> {
        let value = Value::object(value)?;
        self.bind(index, value, None).await
    }

    /// Arrays are not supported
    pub async fn set_array(&self, _index: usize, _elements: Vec<Value>) -> Result<()> {
        Err(Error::Unsupported("array parameters".to_string()))
    }

    /// REF values are not supported
    pub async fn set_ref(&self, _index: usize, _reference: &str) -> Result<()> {
        Err(Error::Unsupported("REF parameters".to_string()))
    }

    /// XML values are not supported
    pub async fn set_sqlxml(&self, _index: usize, _xml: &str) -> Result<()> {
        Err(Error::Unsupported("SQLXML parameters".to_string()))
    }

    /// URL values are not supported
    pub async fn set_url(&self, _index: usize, _url: &str) -> Result<()> {
        Err(Error::Unsupported("URL parameters".to_string()))
    }

    /// Row identifiers are not supported
    pub async fn set_row_id(&self, _index: usize, _row_id: &[u8]) -> Result<()> {
        Err(Error::Unsupported("ROWID parameters".to_string()))
    }

    /// Unbind every parameter
    pub async fn clear_parameters(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        inner.params.clear();
        Ok(())
    }

    /// Check if the parameter at `index` has a value for the next execution
    pub async fn is_parameter_set(&self, index: usize) -> bool {
        self.inner.lock().await.params.is_set(index)
    }

    // =========================================================================
    // Execution Settings
    // =========================================================================

    /// Cap the rows returned by queries; 0 removes the cap
    pub async fn set_max_rows(&self, max_rows: u64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        inner.builder.set_max_rows(max_rows);
        Ok(())
    }

    /// Row cap of queries, 0 for none
    pub async fn max_rows(&self) -> u64 {
        self.inner.lock().await.builder.max_rows()
    }

    /// Set the fetch size hint
    pub async fn set_fetch_size(&self, fetch_size: u32) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        inner.builder.set_fetch_size(fetch_size);
        Ok(())
    }

    /// Fetch size hint
    pub async fn fetch_size(&self) -> u32 {
        self.inner.lock().await.builder.fetch_size()
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute the statement; returns true if it produced rows
    ///
    /// The result is available from [`result_set`](Self::result_set) or
    /// [`update_count`](Self::update_count).
    pub async fn execute(&self) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        self.run(&mut inner, None).await?;
        Ok(matches!(inner.result, Some(StatementResult::Rows(_))))
    }

    /// Execute a statement that returns rows
    pub async fn execute_query(&self) -> Result<ResultSet> {
        let mut inner = self.inner.lock().await;
        self.run(&mut inner, Some(StatementReturnType::Rows)).await?;
        match inner.result.take() {
            Some(StatementResult::Rows(rows)) => Ok(self.result_set_from(rows)),
            Some(StatementResult::Update(_)) => Err(Error::WrongResultShape {
                expected: StatementReturnType::Rows.describe(),
                actual: StatementReturnType::Count.describe(),
            }),
            None => Err(Error::Internal("execution left no result".to_string())),
        }
    }

    /// Execute a statement that returns an update count
    pub async fn execute_update(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        self.run(&mut inner, Some(StatementReturnType::Count)).await?;
        match &inner.result {
            Some(StatementResult::Update(update)) => Ok(update.count),
            Some(StatementResult::Rows(_)) => Err(Error::WrongResultShape {
                expected: StatementReturnType::Count.describe(),
                actual: StatementReturnType::Rows.describe(),
            }),
            None => Err(Error::Internal("execution left no result".to_string())),
        }
    }

    async fn run(&self, inner: &mut StatementInner, expected: Option<StatementReturnType>) -> Result<()> {
        self.check_open()?;
        if let Some(expected) = expected {
            check_shape(expected, self.return_type)?;
        }
        if inner.builder.is_batching() {
            return Err(Error::InvalidState(
                "statement has pending batch rows".to_string(),
            ));
        }
        inner.params.check_all_set()?;

        inner.result = None;
        self.conn.clear_warnings();

        let row = inner.params.take_row();
        let mut conn = self.conn.lock().await?;

        let mut stager = LobStager::new(conn.engine()?);
        let values = stager.stage_row(row).await?;
        let lobs = stager.finish();
        inner.builder.attach_lobs(lobs);

        let request = inner.builder.execute(values);
        trace!(
            connection_id = self.conn.id(),
            statement_id = self.statement_id,
            sql = self.sql.as_str(),
            "executing statement"
        );
        let response = conn.engine()?.execute(request).await?.into_result()?;
        drop(conn);

        inner.result = Some(match response {
            Response::Rows(mut rows) => {
                rows.truncate(inner.builder.max_rows());
                trace!(statement_id = self.statement_id, rows = rows.len(), "query returned");
                StatementResult::Rows(rows)
            }
            Response::UpdateCount(update) => {
                trace!(statement_id = self.statement_id, count = update.count, "update returned");
                StatementResult::Update(update)
            }
            other => return Err(unexpected(&other, "execute")),
        });
        Ok(())
    }

    fn result_set_from(&self, rows: RowSet) -> ResultSet {
        let metadata = if rows.columns.is_empty() || rows.columns == self.result_columns {
            Arc::clone(self.result_metadata())
        } else {
            Arc::new(ResultSetMetaData::new(rows.columns.clone()))
        };
        ResultSet::new(
            rows,
            metadata,
            self.result_set_type,
            self.concurrency,
            self.holdability,
        )
    }

    /// Take the rows of the last execution
    ///
    /// Returns `None` if the last execution produced an update count or the
    /// rows were already taken.
    pub async fn result_set(&self) -> Result<Option<ResultSet>> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        match inner.result.take() {
            Some(StatementResult::Rows(rows)) => Ok(Some(self.result_set_from(rows))),
            other => {
                inner.result = other;
                Ok(None)
            }
        }
    }

    /// Update count of the last execution, if it produced one
    pub async fn update_count(&self) -> Result<Option<u64>> {
        let inner = self.inner.lock().await;
        self.check_open()?;
        Ok(match &inner.result {
            Some(StatementResult::Update(update)) => Some(update.count),
            _ => None,
        })
    }

    /// Keys generated by the last execution, when requested at prepare time
    pub async fn generated_keys(&self) -> Result<Option<ResultSet>> {
        let inner = self.inner.lock().await;
        self.check_open()?;
        let keys = match &inner.result {
            Some(StatementResult::Update(update)) => update.generated_keys.clone(),
            _ => None,
        };
        Ok(keys.map(|rows| {
            let metadata = Arc::new(ResultSetMetaData::new(rows.columns.clone()));
            ResultSet::new(
                rows,
                metadata,
                ResultSetType::ForwardOnly,
                Concurrency::ReadOnly,
                self.holdability,
            )
        }))
    }

    /// Value of an OUT or INOUT parameter after execution
    pub async fn output_parameter(&self, index: usize) -> Result<SqlValue> {
        let inner = self.inner.lock().await;
        let pos = inner.params.check_get_index(index)?;
        self.check_open()?;
        match &inner.result {
            Some(StatementResult::Update(update)) => {
                update.output_parameters.get(pos).cloned().ok_or_else(|| {
                    Error::InvalidState(format!("no output value for parameter {}", index))
                })
            }
            _ => Err(Error::InvalidState(
                "statement has not been executed".to_string(),
            )),
        }
    }

    /// Value of a named OUT or INOUT parameter after execution
    pub async fn output_parameter_by_name(&self, name: &str) -> Result<SqlValue> {
        let index = self.find_parameter_index(name)?;
        self.output_parameter(index).await
    }

    /// Declare that an OUT or INOUT parameter will be read as `sql_type`
    ///
    /// Fails for IN parameters, and for types the declared parameter type
    /// cannot be read as.
    pub async fn register_out_parameter(&self, index: usize, sql_type: SqlType) -> Result<()> {
        let inner = self.inner.lock().await;
        let pos = inner.params.check_get_index(index)?;
        self.check_open()?;

        let declared = inner
            .params
            .param_type(pos)
            .map(|t| t.sql_type)
            .ok_or_else(|| Error::Internal(format!("no type for parameter {}", index)))?;
        if !readable_as(declared, sql_type) {
            return Err(Error::InvalidArgument(format!(
                "parameter {} of type {} cannot be read as {}",
                index, declared, sql_type
            )));
        }
        trace!(
            statement_id = self.statement_id,
            index = index,
            sql_type = ?sql_type,
            "out parameter registered"
        );
        Ok(())
    }

    /// Register a named OUT or INOUT parameter
    pub async fn register_out_parameter_by_name(&self, name: &str, sql_type: SqlType) -> Result<()> {
        let index = self.find_parameter_index(name)?;
        self.register_out_parameter(index, sql_type).await
    }

    // =========================================================================
    // Batch
    // =========================================================================

    /// Append the current parameter values as a batch row
    ///
    /// Streams are moved into the row; plain values stay bound.
    pub async fn add_batch(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        inner.params.check_all_set()?;
        let row = inner.params.take_row();
        inner.builder.add_batch_row(row)?;
        trace!(
            statement_id = self.statement_id,
            rows = inner.builder.batch_len(),
            "batch row added"
        );
        Ok(())
    }

    /// Number of pending batch rows
    pub async fn batch_len(&self) -> usize {
        self.inner.lock().await.builder.batch_len()
    }

    /// Drop pending batch rows
    pub async fn clear_batch(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        inner.builder.clear_batch();
        Ok(())
    }

    /// Execute the pending batch rows; returns one update count per row
    ///
    /// The batch buffer is empty afterwards whatever the outcome. When a
    /// row fails, the error carries the counts of the rows that ran before
    /// it.
    pub async fn execute_batch(&self) -> Result<Vec<u64>> {
        let mut inner = self.inner.lock().await;
        self.check_open()?;
        if !inner.builder.is_batching() {
            return Err(Error::InvalidState("no batch rows added".to_string()));
        }

        let rows = inner.builder.take_batch();
        let expected = rows.len();
        inner.result = None;
        self.conn.clear_warnings();

        let mut conn = self.conn.lock().await?;
        let mut stager = LobStager::new(conn.engine()?);
        let staged = stager.stage_rows(rows).await?;
        let lobs = stager.finish();
        inner.builder.attach_lobs(lobs);

        let request = inner.builder.execute_batch(staged);
        trace!(
            connection_id = self.conn.id(),
            statement_id = self.statement_id,
            rows = expected,
            "executing batch"
        );
        let response = conn.engine()?.execute(request).await?;
        drop(conn);

        match response {
            Response::BatchCounts(outcome) => outcome.into_counts(expected),
            Response::Error(failure) => BatchOutcome::failed(Vec::new(), failure).into_counts(expected),
            other => Err(unexpected(&other, "batch")),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the statement and free it in the engine
    ///
    /// Closing twice is a no-op. Nothing is sent when the connection is
    /// already closed.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        inner.params.clear();
        inner.builder.clear_batch();
        inner.builder.discard_lobs();
        inner.result = None;
        let request = inner.builder.free();
        drop(inner);

        if self.conn.is_closed() {
            return Ok(());
        }
        let mut conn = match self.conn.lock().await {
            Ok(conn) => conn,
            Err(_) => return Ok(()),
        };
        conn.engine()?.execute(request).await?.into_result()?;
        trace!(statement_id = self.statement_id, "statement freed");
        Ok(())
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("sql", &self.sql)
            .field("statement_id", &self.statement_id)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn stream_source<R>(reader: R, encoding: StreamEncoding, length: Option<u64>) -> LobSource
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let source = LobSource::new(reader, encoding);
    match length {
        Some(length) => source.with_length(length),
        None => source,
    }
}

fn check_shape(expected: StatementReturnType, actual: StatementReturnType) -> Result<()> {
    if expected != actual {
        return Err(Error::WrongResultShape {
            expected: expected.describe(),
            actual: actual.describe(),
        });
    }
    Ok(())
}

/// Whether an output of the declared type can be read as `requested`
fn readable_as(declared: SqlType, requested: SqlType) -> bool {
    declared == requested
        || (declared.is_numeric() && requested.is_numeric())
        || (declared.is_temporal() && requested.is_temporal())
        || ((declared.is_binary() || declared == SqlType::Blob)
            && (requested.is_binary() || requested == SqlType::Blob))
        || (requested.is_character() && !declared.is_binary() && !declared.is_lob())
        || (declared.is_character() && requested == SqlType::Clob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_shape() {
        assert!(check_shape(StatementReturnType::Rows, StatementReturnType::Rows).is_ok());
        match check_shape(StatementReturnType::Count, StatementReturnType::Rows) {
            Err(Error::WrongResultShape { expected, actual }) => {
                assert_eq!(expected, "update count");
                assert_eq!(actual, "rows");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stream_source_length() {
        let source = stream_source(std::io::Cursor::new(vec![1u8, 2]), StreamEncoding::Binary, Some(2));
        assert_eq!(source.length(), Some(2));
        let source = stream_source(std::io::Cursor::new(vec![1u8]), StreamEncoding::Ascii, None);
        assert_eq!(source.length(), None);
        assert_eq!(source.encoding(), StreamEncoding::Ascii);
    }

    #[test]
    fn test_readable_as() {
        assert!(readable_as(SqlType::Integer, SqlType::Decimal));
        assert!(readable_as(SqlType::Timestamp, SqlType::Date));
        assert!(readable_as(SqlType::Integer, SqlType::VarChar));
        assert!(readable_as(SqlType::VarBinary, SqlType::Blob));
        assert!(readable_as(SqlType::VarChar, SqlType::Clob));
        assert!(!readable_as(SqlType::Integer, SqlType::Date));
        assert!(!readable_as(SqlType::VarBinary, SqlType::VarChar));
        assert!(!readable_as(SqlType::Boolean, SqlType::Blob));
    }
}
