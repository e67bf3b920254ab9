//! Scripted engine used by the integration tests
//!
//! The engine answers prepare requests from registered descriptors and
//! records every call, so tests can check what reached the engine and when.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sqlbridge::request::LobCreate;
use sqlbridge::{
    AttributeValue, BatchOutcome, Config, Connection, Engine, EngineFailure, IsolationLevel,
    LobData, LobHandle, LobKind, PreparedDescriptor, Request, Response, Result, SessionAttribute,
};

pub const SESSION_ID: i64 = 7;

/// Everything the engine was asked to do
#[derive(Debug, Default)]
pub struct Log {
    pub requests: Vec<Request>,
    pub calls: Vec<String>,
    pub lobs: Vec<LobCreate>,
    pub closed: bool,
}

impl Log {
    /// Number of engine interactions of any kind
    pub fn interactions(&self) -> usize {
        self.requests.len() + self.calls.len()
    }

    /// Requests of the given kind
    pub fn requests_of(&self, kind: &str) -> Vec<&Request> {
        self.requests.iter().filter(|r| r.kind() == kind).collect()
    }
}

#[derive(Debug, Clone)]
struct Settings {
    auto_commit: bool,
    read_only: bool,
    isolation: IsolationLevel,
    catalog: Option<String>,
}

pub struct TestEngine {
    log: Arc<Mutex<Log>>,
    statements: HashMap<String, PreparedDescriptor>,
    results: HashMap<i64, Response>,
    stored: HashMap<i64, LobData>,
    settings: Settings,
    next_lob: i64,
    batch_failure_at: Option<usize>,
    ping_delay: Option<Duration>,
    execute_delay: Option<Duration>,
    failing_savepoint_ops: bool,
}

impl TestEngine {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Log::default())),
            statements: HashMap::new(),
            results: HashMap::new(),
            stored: HashMap::new(),
            settings: Settings {
                auto_commit: true,
                read_only: false,
                isolation: IsolationLevel::ReadCommitted,
                catalog: Some("PUBLIC".to_string()),
            },
            next_lob: 100,
            batch_failure_at: None,
            ping_delay: None,
            execute_delay: None,
            failing_savepoint_ops: false,
        }
    }

    /// Register the descriptor returned when `sql` is prepared
    pub fn with_statement(mut self, sql: &str, descriptor: PreparedDescriptor) -> Self {
        self.statements.insert(sql.to_string(), descriptor);
        self
    }

    /// Response to every execution of a statement id
    pub fn with_result(mut self, statement_id: i64, response: Response) -> Self {
        self.results.insert(statement_id, response);
        self
    }

    /// Stored content of an engine LOB
    pub fn with_lob(mut self, handle: LobHandle, data: LobData) -> Self {
        self.stored.insert(handle.id, data);
        self
    }

    /// Fail batch entry `index` (0-based)
    pub fn fail_batch_at(mut self, index: usize) -> Self {
        self.batch_failure_at = Some(index);
        self
    }

    pub fn ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = Some(delay);
        self
    }

    /// Delay every statement execution
    pub fn execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = Some(delay);
        self
    }

    pub fn failing_savepoint_ops(mut self) -> Self {
        self.failing_savepoint_ops = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<Log>> {
        Arc::clone(&self.log)
    }

    fn call(&self, call: impl Into<String>) {
        self.log.lock().calls.push(call.into());
    }

    fn prepare(&self, sql: &str, request: &sqlbridge::request::PrepareRequest) -> Response {
        match self.statements.get(sql) {
            Some(descriptor) => {
                let mut granted = descriptor.clone();
                granted.result_set_type = request.result_set_type;
                granted.concurrency = request.concurrency;
                granted.holdability = request.holdability;
                Response::Prepared(granted)
            }
            None => Response::error(-5501, "42501", format!("user lacks privilege or object not found: {}", sql)),
        }
    }

    fn descriptor(&self, statement_id: i64) -> Option<&PreparedDescriptor> {
        self.statements
            .values()
            .find(|d| d.statement_id == statement_id)
    }
}

#[async_trait::async_trait]
impl Engine for TestEngine {
    fn session_id(&self) -> i64 {
        SESSION_ID
    }

    async fn execute(&mut self, request: Request) -> Result<Response> {
        self.log.lock().requests.push(request.clone());

        let response = match request {
            Request::Prepare(prepare) => self.prepare(&prepare.sql, &prepare),
            Request::Execute(execute) => {
                if let Some(delay) = self.execute_delay {
                    tokio::time::sleep(delay).await;
                }
                for lob in &execute.lobs {
                    self.stored.insert(lob.handle.id, lob.data.clone());
                }
                self.log.lock().lobs.extend(execute.lobs);
                match self.results.get(&execute.statement_id) {
                    Some(response) => response.clone(),
                    None => match self.descriptor(execute.statement_id) {
                        Some(d) if d.result_columns.is_empty() => {
                            Response::UpdateCount(sqlbridge::UpdateResult::count(1))
                        }
                        Some(d) => Response::Rows(sqlbridge::RowSet::new(d.result_columns.clone(), Vec::new())),
                        None => Response::error(-1, "S1000", "unknown statement"),
                    },
                }
            }
            Request::ExecuteBatch(batch) => {
                self.log.lock().lobs.extend(batch.lobs);
                match self.batch_failure_at {
                    Some(index) if index < batch.rows.len() => Response::BatchCounts(BatchOutcome::failed(
                        vec![1; index],
                        EngineFailure::new(-104, "23505", "unique constraint violation"),
                    )),
                    _ => Response::BatchCounts(BatchOutcome::success(vec![1; batch.rows.len()])),
                }
            }
            Request::FreeStatement { .. } => Response::Ok,
            Request::Ping => {
                if let Some(delay) = self.ping_delay {
                    tokio::time::sleep(delay).await;
                }
                Response::Ok
            }
        };
        Ok(response)
    }

    async fn create_blob(&mut self, length: u64) -> Result<LobHandle> {
        self.next_lob += 1;
        self.call(format!("create_blob {}", length));
        Ok(LobHandle::new(self.next_lob, SESSION_ID, length, LobKind::Binary))
    }

    async fn create_clob(&mut self, length: u64) -> Result<LobHandle> {
        self.next_lob += 1;
        self.call(format!("create_clob {}", length));
        Ok(LobHandle::new(self.next_lob, SESSION_ID, length, LobKind::Character))
    }

    async fn read_lob(&mut self, handle: &LobHandle) -> Result<LobData> {
        self.call(format!("read_lob {}", handle.id));
        Ok(self
            .stored
            .get(&handle.id)
            .cloned()
            .unwrap_or(LobData::Bytes(bytes::Bytes::new())))
    }

    async fn attribute(&mut self, attribute: SessionAttribute) -> Result<AttributeValue> {
        Ok(match attribute {
            SessionAttribute::AutoCommit => AttributeValue::Bool(self.settings.auto_commit),
            SessionAttribute::ReadOnly => AttributeValue::Bool(self.settings.read_only),
            SessionAttribute::Isolation => AttributeValue::Isolation(self.settings.isolation),
            SessionAttribute::Catalog => AttributeValue::Text(self.settings.catalog.clone()),
        })
    }

    async fn set_attribute(&mut self, attribute: SessionAttribute, value: AttributeValue) -> Result<()> {
        self.call(format!("set {}", attribute.name()));
        match attribute {
            SessionAttribute::AutoCommit => self.settings.auto_commit = value.into_bool(attribute)?,
            SessionAttribute::ReadOnly => self.settings.read_only = value.into_bool(attribute)?,
            SessionAttribute::Isolation => self.settings.isolation = value.into_isolation(attribute)?,
            SessionAttribute::Catalog => self.settings.catalog = value.into_text(attribute)?,
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.call("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.call("rollback");
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> Result<()> {
        self.call(format!("savepoint {}", name));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        self.call(format!("release {}", name));
        if self.failing_savepoint_ops {
            return Err(sqlbridge::Error::engine(-4821, "3B001", "savepoint exception"));
        }
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        self.call(format!("rollback to {}", name));
        if self.failing_savepoint_ops {
            return Err(sqlbridge::Error::engine(-4821, "3B001", "savepoint exception"));
        }
        Ok(())
    }

    async fn reset_session(&mut self) -> Result<()> {
        self.call("reset");
        self.settings.auto_commit = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().closed = true;
        Ok(())
    }
}

/// Open a connection over `engine`, returning the connection and its call log
pub async fn open(engine: TestEngine) -> (Connection, Arc<Mutex<Log>>) {
    let log = engine.log();
    let conn = Connection::open(Config::new("test"), Box::new(engine))
        .await
        .expect("open connection");
    log.lock().calls.clear();
    (conn, log)
}
