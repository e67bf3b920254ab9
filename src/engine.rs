//! The engine boundary
//!
//! The SQL parser, planner, transaction manager, storage and LOB store live
//! behind the [`Engine`] trait. A connection exclusively owns one engine
//! session and serializes every call to it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlbridge::{Config, Connection, Engine, EngineFactory};
//!
//! struct MyFactory;
//!
//! #[async_trait::async_trait]
//! impl EngineFactory for MyFactory {
//!     async fn connect(&self, config: &Config) -> sqlbridge::Result<Box<dyn Engine>> {
//!         Ok(Box::new(MyEngine::open(config.database())?))
//!     }
//! }
//!
//! let config: Config = "mem:test;user=SA".parse()?;
//! let conn = Connection::connect(config, &MyFactory).await?;
//! ```

use crate::config::Config;
use crate::constants::IsolationLevel;
use crate::error::{Error, Result};
use crate::request::{Request, Response};
use crate::types::{LobData, LobHandle};

/// Session attribute held by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAttribute {
    /// Auto-commit mode (boolean)
    AutoCommit,
    /// Read-only mode (boolean)
    ReadOnly,
    /// Transaction isolation level
    Isolation,
    /// Current catalog (text, may be absent)
    Catalog,
}

impl SessionAttribute {
    /// Attribute name, for logging and error messages
    pub fn name(&self) -> &'static str {
        match self {
            SessionAttribute::AutoCommit => "auto_commit",
            SessionAttribute::ReadOnly => "read_only",
            SessionAttribute::Isolation => "isolation",
            SessionAttribute::Catalog => "catalog",
        }
    }
}

/// Value of a session attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Boolean attribute
    Bool(bool),
    /// Isolation level
    Isolation(IsolationLevel),
    /// Text attribute
    Text(Option<String>),
}

impl AttributeValue {
    /// Get as bool, failing for other kinds
    pub fn into_bool(self, attribute: SessionAttribute) -> Result<bool> {
        match self {
            AttributeValue::Bool(b) => Ok(b),
            other => Err(wrong_kind(attribute, &other)),
        }
    }

    /// Get as isolation level, failing for other kinds
    pub fn into_isolation(self, attribute: SessionAttribute) -> Result<IsolationLevel> {
        match self {
            AttributeValue::Isolation(level) => Ok(level),
            other => Err(wrong_kind(attribute, &other)),
        }
    }

    /// Get as text, failing for other kinds
    pub fn into_text(self, attribute: SessionAttribute) -> Result<Option<String>> {
        match self {
            AttributeValue::Text(text) => Ok(text),
            other => Err(wrong_kind(attribute, &other)),
        }
    }
}

fn wrong_kind(attribute: SessionAttribute, value: &AttributeValue) -> Error {
    Error::Internal(format!(
        "engine returned {:?} for attribute {}",
        value,
        attribute.name()
    ))
}

/// Engine session driven by a connection
///
/// Every method is one round trip. Errors returned here are engine-level
/// failures such as a broken session; SQL errors come back as
/// [`Response::Error`] from [`Engine::execute`].
#[async_trait::async_trait]
pub trait Engine: Send {
    /// Identifier of the session, used to scope LOB handles
    fn session_id(&self) -> i64;

    /// Execute a request
    async fn execute(&mut self, request: Request) -> Result<Response>;

    /// Allocate a BLOB of `length` bytes
    async fn create_blob(&mut self, length: u64) -> Result<LobHandle>;

    /// Allocate a CLOB of `length` characters
    async fn create_clob(&mut self, length: u64) -> Result<LobHandle>;

    /// Read the full content of a LOB
    async fn read_lob(&mut self, handle: &LobHandle) -> Result<LobData>;

    /// Read a session attribute
    async fn attribute(&mut self, attribute: SessionAttribute) -> Result<AttributeValue>;

    /// Change a session attribute
    async fn set_attribute(
        &mut self,
        attribute: SessionAttribute,
        value: AttributeValue,
    ) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction
    async fn rollback(&mut self) -> Result<()>;

    /// Create a savepoint
    async fn savepoint(&mut self, name: &str) -> Result<()>;

    /// Release a savepoint
    async fn release_savepoint(&mut self, name: &str) -> Result<()>;

    /// Roll back to a savepoint
    async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()>;

    /// Reset the session to its initial state for reuse
    async fn reset_session(&mut self) -> Result<()>;

    /// Close the session
    async fn close(&mut self) -> Result<()>;
}

/// Opens engine sessions from connection configuration
#[async_trait::async_trait]
pub trait EngineFactory: Send + Sync {
    /// Open a new session
    async fn connect(&self, config: &Config) -> Result<Box<dyn Engine>>;
}
