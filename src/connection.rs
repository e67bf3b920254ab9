//! Connection session management
//!
//! A [`Connection`] exclusively owns one engine session. Every call that
//! touches the engine (statement creation, execution, transaction control,
//! savepoints, close) runs under a per-connection async mutex, so a close
//! racing an execute never sees a half torn-down session. The warning chain
//! has its own lock and never waits on an in-flight execute.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::constants::{
    Concurrency, Holdability, IsolationLevel, ResultSetType, SYSTEM_SAVEPOINT_PREFIX,
};
use crate::engine::{AttributeValue, Engine, EngineFactory, SessionAttribute};
use crate::error::{Error, Result};
use crate::escape;
use crate::request::{unexpected, GeneratedKeys, Request, RequestBuilder, Response};
use crate::statement::PreparedStatement;
use crate::types::{Blob, Clob};
use crate::value::Value;
use crate::warning::{Warning, WarningChain};

// Connection ID counter
static CONNECTION_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Result properties and generated-key mode requested when preparing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOptions {
    /// Requested scrollability
    pub result_set_type: ResultSetType,
    /// Requested concurrency
    pub concurrency: Concurrency,
    /// Requested holdability, the connection default when unset
    pub holdability: Option<Holdability>,
    /// Generated-key reporting mode
    pub generated_keys: GeneratedKeys,
}

impl StatementOptions {
    /// Default options: forward-only, read-only, connection holdability
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scrollability
    pub fn result_set_type(mut self, result_set_type: ResultSetType) -> Self {
        self.result_set_type = result_set_type;
        self
    }

    /// Set concurrency
    pub fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set holdability
    pub fn holdability(mut self, holdability: Holdability) -> Self {
        self.holdability = Some(holdability);
        self
    }

    /// Report all generated keys
    pub fn return_generated_keys(mut self) -> Self {
        self.generated_keys = GeneratedKeys::All;
        self
    }

    /// Report generated keys of the columns at these 1-based indexes
    pub fn key_columns(mut self, indexes: Vec<usize>) -> Self {
        self.generated_keys = GeneratedKeys::Indexes(indexes);
        self
    }

    /// Report generated keys of the named columns
    pub fn key_column_names(mut self, names: Vec<String>) -> Self {
        self.generated_keys = GeneratedKeys::Names(names);
        self
    }
}

/// Savepoint within a transaction
///
/// A savepoint stays usable until it is released or rolled back to, or
/// until the transaction that created it ends. Handles of other
/// connections are rejected.
#[derive(Debug)]
pub struct Savepoint {
    name: String,
    serial: u64,
    named: bool,
    connection_id: u32,
    generation: u64,
    invalidated: AtomicBool,
}

impl Savepoint {
    /// Savepoint name; system-generated for unnamed savepoints
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric id of an unnamed savepoint
    pub fn id(&self) -> Option<u64> {
        (!self.named).then_some(self.serial)
    }

    /// Check if the savepoint was created with a caller-supplied name
    pub fn is_named(&self) -> bool {
        self.named
    }

    /// Check if the handle has been invalidated by this connection
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Relaxed)
    }

    fn invalidate(&self) {
        self.invalidated.store(true, Ordering::Relaxed);
    }
}

/// Engine session and transaction state guarded by the connection lock
pub(crate) struct ConnectionInner {
    engine: Option<Box<dyn Engine>>,
    holdability: Holdability,
    /// Incremented whenever a transaction ends
    generation: u64,
    savepoint_seq: u64,
    /// Live savepoints as (name, serial), oldest first
    savepoints: Vec<(String, u64)>,
}

impl ConnectionInner {
    fn new(engine: Box<dyn Engine>, holdability: Holdability) -> Self {
        Self {
            engine: Some(engine),
            holdability,
            generation: 0,
            savepoint_seq: 0,
            savepoints: Vec::new(),
        }
    }

    /// The engine session, failing once it has been released
    pub(crate) fn engine(&mut self) -> Result<&mut dyn Engine> {
        match self.engine.as_mut() {
            Some(engine) => Ok(engine.as_mut()),
            None => Err(Error::SessionClosed),
        }
    }

    fn end_transaction(&mut self) {
        self.generation += 1;
        self.savepoints.clear();
    }

    async fn auto_commit(&mut self) -> Result<bool> {
        self.engine()?
            .attribute(SessionAttribute::AutoCommit)
            .await?
            .into_bool(SessionAttribute::AutoCommit)
    }
}

/// State shared by a connection and its statements
pub(crate) struct ConnectionShared {
    id: u32,
    config: Config,
    internal: bool,
    closed: AtomicBool,
    inner: Mutex<ConnectionInner>,
    warnings: parking_lot::Mutex<WarningChain>,
}

impl ConnectionShared {
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn session_zone(&self) -> FixedOffset {
        self.config.session_zone
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Acquire the connection lock, failing if the connection is closed
    pub(crate) async fn lock(&self) -> Result<MutexGuard<'_, ConnectionInner>> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        let inner = self.inner.lock().await;
        // close() may have been called while this caller was queued
        if inner.engine.is_none() || self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(inner)
    }

    pub(crate) fn add_warning(&self, warning: Warning) {
        trace!(connection_id = self.id, warning = %warning, "warning added");
        self.warnings.lock().push(warning);
    }

    pub(crate) fn clear_warnings(&self) {
        self.warnings.lock().clear();
    }
}

/// A session with the database engine
///
/// # Example
///
/// ```rust,ignore
/// use sqlbridge::{Config, Connection};
///
/// let conn = Connection::connect(Config::new("test"), &factory).await?;
/// let stmt = conn.prepare_statement("SELECT * FROM T WHERE ID = ?").await?;
/// stmt.set_i32(1, 42).await?;
/// let mut rows = stmt.execute_query().await?;
/// while rows.next()? {
///     println!("{:?}", rows.row()?);
/// }
/// conn.close().await?;
/// ```
///
/// # Thread Safety
///
/// `Connection` is `Send` and `Sync`; operations are serialized internally.
pub struct Connection {
    shared: Arc<ConnectionShared>,
}

impl Connection {
    /// Open a session through an engine factory
    ///
    /// Fails with an I/O timeout if the factory does not answer within
    /// [`Config::connect_timeout`].
    pub async fn connect<F>(config: Config, factory: &F) -> Result<Self>
    where
        F: EngineFactory + ?Sized,
    {
        let engine = tokio::time::timeout(config.connect_timeout, factory.connect(&config))
            .await
            .map_err(|_| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", config),
                ))
            })??;
        Self::open(config, engine).await
    }

    /// Open a session from a connection string
    ///
    /// ```rust,ignore
    /// let conn = Connection::connect_url("mem:test;user=SA", &factory).await?;
    /// ```
    pub async fn connect_url<F>(url: &str, factory: &F) -> Result<Self>
    where
        F: EngineFactory + ?Sized,
    {
        let config: Config = url.parse()?;
        Self::connect(config, factory).await
    }

    /// Wrap an already opened engine session, applying the session settings
    /// of `config`
    pub async fn open(config: Config, mut engine: Box<dyn Engine>) -> Result<Self> {
        engine
            .set_attribute(
                SessionAttribute::AutoCommit,
                AttributeValue::Bool(config.auto_commit),
            )
            .await?;
        if config.read_only {
            engine
                .set_attribute(SessionAttribute::ReadOnly, AttributeValue::Bool(true))
                .await?;
        }
        if let Some(level) = config.isolation {
            engine
                .set_attribute(SessionAttribute::Isolation, AttributeValue::Isolation(level))
                .await?;
        }

        let session_id = engine.session_id();
        let conn = Self::build(config, engine, false);
        debug!(connection_id = conn.id(), session_id = session_id, "connection opened");
        Ok(conn)
    }

    /// Wrap the engine session of code running inside the engine
    ///
    /// The session is left as it is, and `close()` has no effect: the
    /// session belongs to its caller.
    pub fn internal(engine: Box<dyn Engine>) -> Self {
        Self::build(Config::default(), engine, true)
    }

    fn build(config: Config, engine: Box<dyn Engine>, internal: bool) -> Self {
        let id = CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let inner = ConnectionInner::new(engine, config.holdability);
        Connection {
            shared: Arc::new(ConnectionShared {
                id,
                config,
                internal,
                closed: AtomicBool::new(false),
                inner: Mutex::new(inner),
                warnings: parking_lot::Mutex::new(WarningChain::new()),
            }),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> u32 {
        self.shared.id
    }

    /// Check if the connection is closed
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Check if this wraps an engine-internal session
    pub fn is_internal(&self) -> bool {
        self.shared.internal
    }

    /// Configuration the connection was opened with
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Prepare a statement with default result properties
    pub async fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement> {
        self.prepare_with(sql, StatementOptions::default()).await
    }

    /// Prepare a statement
    ///
    /// Escape sequences are normalized first. Scroll-sensitive results are
    /// downgraded to scroll-insensitive and updatable results to read-only,
    /// each with a warning. A warning is also added when the engine grants
    /// result properties other than the ones requested.
    pub async fn prepare_with(&self, sql: &str, options: StatementOptions) -> Result<PreparedStatement> {
        self.check_open()?;
        let normalized = escape::normalize(sql)?;
        validate_generated_keys(&options.generated_keys)?;

        let result_set_type = self.translate_result_set_type(options.result_set_type);
        let concurrency = self.translate_concurrency(options.concurrency);

        let mut inner = self.shared.lock().await?;
        let holdability = options.holdability.unwrap_or(inner.holdability);
        let request = RequestBuilder::prepare(
            normalized,
            result_set_type,
            concurrency,
            holdability,
            options.generated_keys,
        );

        trace!(connection_id = self.id(), sql = sql, "preparing statement");
        let response = inner.engine()?.execute(request).await?.into_result()?;
        drop(inner);

        let descriptor = match response {
            Response::Prepared(descriptor) => descriptor,
            other => return Err(unexpected(&other, "prepare")),
        };

        if descriptor.result_set_type != result_set_type
            || descriptor.concurrency != concurrency
            || descriptor.holdability != holdability
        {
            self.shared.add_warning(Warning::option_changed(format!(
                "result properties changed: requested {:?}/{:?}/{:?}, granted {:?}/{:?}/{:?}",
                result_set_type,
                concurrency,
                holdability,
                descriptor.result_set_type,
                descriptor.concurrency,
                descriptor.holdability
            )));
        }

        trace!(
            connection_id = self.id(),
            statement_id = descriptor.statement_id,
            parameters = descriptor.parameters.len(),
            "statement prepared"
        );
        Ok(PreparedStatement::new(
            Arc::clone(&self.shared),
            sql.to_string(),
            descriptor,
        ))
    }

    fn translate_result_set_type(&self, requested: ResultSetType) -> ResultSetType {
        match requested {
            ResultSetType::ScrollSensitive => {
                self.shared.add_warning(Warning::option_changed(
                    "ScrollSensitive result set type changed to ScrollInsensitive",
                ));
                ResultSetType::ScrollInsensitive
            }
            other => other,
        }
    }

    fn translate_concurrency(&self, requested: Concurrency) -> Concurrency {
        match requested {
            Concurrency::Updatable => {
                self.shared.add_warning(Warning::option_changed(
                    "Updatable concurrency changed to ReadOnly",
                ));
                Concurrency::ReadOnly
            }
            other => other,
        }
    }

    /// Rewrite escape sequences in `sql` the way `prepare_statement` does
    pub fn native_sql(&self, sql: &str) -> Result<String> {
        self.check_open()?;
        escape::normalize(sql)
    }

    // =========================================================================
    // Session Attributes
    // =========================================================================

    /// Set auto-commit mode
    ///
    /// Switching from manual commit to auto-commit ends the current
    /// transaction and invalidates every live savepoint.
    pub async fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        let previous = inner.auto_commit().await?;
        inner
            .engine()?
            .set_attribute(SessionAttribute::AutoCommit, AttributeValue::Bool(auto_commit))
            .await?;
        if auto_commit && !previous {
            inner.end_transaction();
        }
        debug!(connection_id = self.id(), auto_commit = auto_commit, "auto-commit changed");
        Ok(())
    }

    /// Get auto-commit mode
    pub async fn auto_commit(&self) -> Result<bool> {
        let mut inner = self.shared.lock().await?;
        inner.auto_commit().await
    }

    /// Set read-only mode
    pub async fn set_read_only(&self, read_only: bool) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .set_attribute(SessionAttribute::ReadOnly, AttributeValue::Bool(read_only))
            .await
    }

    /// Get read-only mode
    pub async fn is_read_only(&self) -> Result<bool> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .attribute(SessionAttribute::ReadOnly)
            .await?
            .into_bool(SessionAttribute::ReadOnly)
    }

    /// Set the current catalog
    pub async fn set_catalog(&self, catalog: &str) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .set_attribute(
                SessionAttribute::Catalog,
                AttributeValue::Text(Some(catalog.to_string())),
            )
            .await
    }

    /// Get the current catalog
    pub async fn catalog(&self) -> Result<Option<String>> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .attribute(SessionAttribute::Catalog)
            .await?
            .into_text(SessionAttribute::Catalog)
    }

    /// Set the transaction isolation level
    pub async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .set_attribute(SessionAttribute::Isolation, AttributeValue::Isolation(level))
            .await
    }

    /// Get the transaction isolation level
    pub async fn transaction_isolation(&self) -> Result<IsolationLevel> {
        let mut inner = self.shared.lock().await?;
        inner
            .engine()?
            .attribute(SessionAttribute::Isolation)
            .await?
            .into_isolation(SessionAttribute::Isolation)
    }

    /// Set the default holdability of statements prepared from now on
    pub async fn set_holdability(&self, holdability: Holdability) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner.holdability = holdability;
        Ok(())
    }

    /// Default holdability of new statements
    pub async fn holdability(&self) -> Result<Holdability> {
        let inner = self.shared.lock().await?;
        Ok(inner.holdability)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Commit the current transaction
    pub async fn commit(&self) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner.engine()?.commit().await?;
        inner.end_transaction();
        trace!(connection_id = self.id(), "committed");
        Ok(())
    }

    /// Roll back the current transaction
    pub async fn rollback(&self) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner.engine()?.rollback().await?;
        inner.end_transaction();
        trace!(connection_id = self.id(), "rolled back");
        Ok(())
    }

    /// Create a savepoint in the current transaction
    ///
    /// Fails under auto-commit. Without a name, a `SYSTEM_SAVEPOINT_<n>`
    /// name is generated; caller-supplied names may not use that prefix.
    /// Reusing the name of a live savepoint replaces it.
    pub async fn set_savepoint(&self, name: Option<&str>) -> Result<Savepoint> {
        if let Some(name) = name {
            if name.is_empty() {
                return Err(Error::InvalidArgument("empty savepoint name".to_string()));
            }
            if name
                .to_ascii_uppercase()
                .starts_with(SYSTEM_SAVEPOINT_PREFIX)
            {
                return Err(Error::InvalidSavepoint(format!(
                    "{} is a reserved savepoint name",
                    name
                )));
            }
        }

        let mut inner = self.shared.lock().await?;
        if inner.auto_commit().await? {
            return Err(Error::InvalidSavepoint(
                "savepoint requested in auto-commit mode".to_string(),
            ));
        }

        inner.savepoint_seq += 1;
        let serial = inner.savepoint_seq;
        let named = name.is_some();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{}_{}", SYSTEM_SAVEPOINT_PREFIX, serial),
        };

        inner.engine()?.savepoint(&name).await?;
        inner.savepoints.retain(|(live, _)| *live != name);
        inner.savepoints.push((name.clone(), serial));

        trace!(connection_id = self.id(), savepoint = %name, "savepoint set");
        Ok(Savepoint {
            name,
            named,
            serial,
            connection_id: self.id(),
            generation: inner.generation,
            invalidated: AtomicBool::new(false),
        })
    }

    /// Roll back to a savepoint; it and every later savepoint become invalid
    pub async fn rollback_to_savepoint(&self, savepoint: &Savepoint) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        let pos = self.check_savepoint(&mut inner, savepoint).await?;
        inner.engine()?.rollback_to_savepoint(&savepoint.name).await?;
        inner.savepoints.truncate(pos);
        savepoint.invalidate();
        trace!(connection_id = self.id(), savepoint = %savepoint.name, "rolled back to savepoint");
        Ok(())
    }

    /// Release a savepoint; it and every later savepoint become invalid
    pub async fn release_savepoint(&self, savepoint: &Savepoint) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        let pos = self.check_savepoint(&mut inner, savepoint).await?;
        inner.engine()?.release_savepoint(&savepoint.name).await?;
        inner.savepoints.truncate(pos);
        savepoint.invalidate();
        trace!(connection_id = self.id(), savepoint = %savepoint.name, "savepoint released");
        Ok(())
    }

    /// Validate a savepoint handle; returns its position in the live stack
    async fn check_savepoint(&self, inner: &mut ConnectionInner, savepoint: &Savepoint) -> Result<usize> {
        if savepoint.connection_id != self.id() {
            return Err(Error::InvalidSavepoint(format!(
                "{} belongs to another connection",
                savepoint.name
            )));
        }
        if savepoint.is_invalidated() {
            return Err(Error::InvalidSavepoint(format!(
                "{} is no longer valid",
                savepoint.name
            )));
        }
        if inner.auto_commit().await? {
            savepoint.invalidate();
            return Err(Error::InvalidSavepoint(
                "savepoint used in auto-commit mode".to_string(),
            ));
        }
        let pos = inner
            .savepoints
            .iter()
            .position(|(_, serial)| *serial == savepoint.serial);
        match pos {
            Some(pos) if savepoint.generation == inner.generation => Ok(pos),
            _ => {
                savepoint.invalidate();
                Err(Error::InvalidSavepoint(format!(
                    "{} ended with its transaction",
                    savepoint.name
                )))
            }
        }
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Check that the session answers within `timeout`
    ///
    /// A zero timeout waits indefinitely. When the timer wins, the probe is
    /// abandoned and keeps running in the background. Internal connections
    /// are always valid.
    pub async fn is_valid(&self, timeout: Duration) -> bool {
        if self.shared.internal {
            return true;
        }
        if self.is_closed() {
            return false;
        }

        let shared = Arc::clone(&self.shared);
        let probe = tokio::spawn(async move {
            let mut inner = shared.lock().await?;
            inner
                .engine()?
                .execute(Request::Ping)
                .await?
                .into_result()
                .map(|_| ())
        });

        let outcome = if timeout.is_zero() {
            probe.await
        } else {
            match tokio::time::timeout(timeout, probe).await {
                Ok(joined) => joined,
                Err(_) => {
                    debug!(connection_id = self.id(), ?timeout, "validity probe timed out");
                    return false;
                }
            }
        };
        matches!(outcome, Ok(Ok(())))
    }

    /// Reset the session for reuse by a pool
    pub async fn reset(&self) -> Result<()> {
        let mut inner = self.shared.lock().await?;
        inner.engine()?.reset_session().await?;
        inner.end_transaction();
        inner.holdability = self.shared.config.holdability;
        drop(inner);
        self.shared.clear_warnings();
        debug!(connection_id = self.id(), "session reset");
        Ok(())
    }

    /// Close the connection
    ///
    /// Closing twice is a no-op. Errors from the engine while releasing the
    /// session are logged, not returned. Has no effect on internal
    /// connections.
    pub async fn close(&self) -> Result<()> {
        if self.shared.internal {
            return Ok(());
        }
        if self.shared.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let mut inner = self.shared.inner.lock().await;
        if let Some(mut engine) = inner.engine.take() {
            if let Err(e) = engine.close().await {
                warn!(connection_id = self.id(), error = %e, "error closing engine session");
            }
        }
        inner.end_transaction();
        drop(inner);

        self.shared.clear_warnings();
        debug!(connection_id = self.id(), "connection closed");
        Ok(())
    }

    // =========================================================================
    // LOBs
    // =========================================================================

    /// Allocate an empty BLOB of `length` bytes in the engine
    pub async fn create_blob(&self, length: u64) -> Result<Blob> {
        let mut inner = self.shared.lock().await?;
        let handle = inner.engine()?.create_blob(length).await?;
        Ok(Blob::Remote(handle))
    }

    /// Allocate an empty CLOB of `length` characters in the engine
    pub async fn create_clob(&self, length: u64) -> Result<Clob> {
        let mut inner = self.shared.lock().await?;
        let handle = inner.engine()?.create_clob(length).await?;
        Ok(Clob::Remote(handle))
    }

    // =========================================================================
    // Unsupported Capabilities
    // =========================================================================

    /// Arrays are not supported
    pub fn create_array_of(&self, type_name: &str, _elements: Vec<Value>) -> Result<Value> {
        Err(Error::Unsupported(format!("array of {}", type_name)))
    }

    /// Structured types are not supported
    pub fn create_struct(&self, type_name: &str, _attributes: Vec<Value>) -> Result<Value> {
        Err(Error::Unsupported(format!("struct {}", type_name)))
    }

    /// XML values are not supported
    pub fn create_sqlxml(&self) -> Result<Value> {
        Err(Error::Unsupported("SQLXML".to_string()))
    }

    /// Custom type maps are not supported
    pub fn set_type_map(&self, _map: std::collections::HashMap<String, String>) -> Result<()> {
        Err(Error::Unsupported("type map".to_string()))
    }

    // =========================================================================
    // Warnings
    // =========================================================================

    /// Warnings reported on this connection, oldest first
    pub fn warnings(&self) -> Vec<Warning> {
        self.shared.warnings.lock().to_vec()
    }

    /// Append a warning to the chain
    pub fn add_warning(&self, warning: Warning) {
        self.shared.add_warning(warning);
    }

    /// Clear the warning chain
    pub fn clear_warnings(&self) {
        self.shared.clear_warnings();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Can't do async cleanup in Drop; call close() explicitly
        if !self.shared.internal {
            self.shared.closed.store(true, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.shared.id)
            .field("config", &self.shared.config)
            .field("internal", &self.shared.internal)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn validate_generated_keys(keys: &GeneratedKeys) -> Result<()> {
    match keys {
        GeneratedKeys::Indexes(indexes) if indexes.contains(&0) => Err(Error::InvalidArgument(
            "generated key column indexes start at 1".to_string(),
        )),
        GeneratedKeys::Names(names) if names.iter().any(|n| n.trim().is_empty()) => Err(
            Error::InvalidArgument("empty generated key column name".to_string()),
        ),
        _ => Ok(()),
    }
}
