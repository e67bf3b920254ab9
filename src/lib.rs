#![warn(missing_docs)]

//! # sqlbridge
//!
//! Client session layer for an embedded relational engine.
//!
//! This crate sits between application code and an engine session. It
//! prepares statements, binds and converts parameters, stages LOB content
//! before execution, runs single and batched executions, and manages
//! transactions and savepoints. The engine itself is reached through the
//! [`Engine`] trait, so the same session layer works over an in-process
//! engine or a remote one.
//!
//! ## Features
//!
//! - **Async/await** - Built on Tokio; a connection can be shared across tasks
//! - **Typed parameters** - Values are checked and converted against the
//!   declared parameter types at bind time
//! - **LOB staging** - Streams and in-memory LOBs are created engine-side
//!   and sent by handle
//! - **Batches** - Many parameter rows, one round trip
//! - **Escape sequences** - `{call ...}`, `{fn ...}`, `{ts ...}` and friends
//!   are normalized before prepare
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlbridge::{Config, Connection, EngineFactory};
//!
//! # async fn example(factory: &dyn EngineFactory) -> sqlbridge::Result<()> {
//! let config: Config = "mem:test;user=SA".parse()?;
//! let conn = Connection::connect(config, factory).await?;
//!
//! let stmt = conn.prepare_statement("SELECT ID, NAME FROM USERS WHERE ID > ?").await?;
//! stmt.set_i32(1, 10).await?;
//!
//! let mut rows = stmt.execute_query().await?;
//! while rows.next()? {
//!     let id = rows.get(1)?.as_i64().unwrap_or(0);
//!     let name = rows.get_by_name("NAME")?.as_str().unwrap_or("");
//!     println!("User {}: {}", id, name);
//! }
//!
//! stmt.close().await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! use sqlbridge::Connection;
//!
//! # async fn example(conn: Connection) -> sqlbridge::Result<()> {
//! conn.set_auto_commit(false).await?;
//!
//! let insert = conn.prepare_statement("INSERT INTO ACCOUNTS VALUES (?, ?)").await?;
//! insert.set_i32(1, 1).await?;
//! insert.set_f64(2, 100.0).await?;
//! insert.execute_update().await?;
//!
//! // Savepoints
//! let sp = conn.set_savepoint(Some("BEFORE_UPDATE")).await?;
//! let update = conn.prepare_statement("UPDATE ACCOUNTS SET BALANCE = 0").await?;
//! update.execute_update().await?;
//! conn.rollback_to_savepoint(&sp).await?;
//!
//! conn.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Parameter Types
//!
//! | SQL Type | Rust Type |
//! |----------|-----------|
//! | TINYINT .. BIGINT | `i8`, `i16`, `i32`, `i64` |
//! | REAL, DOUBLE | `f32`, `f64` |
//! | NUMERIC, DECIMAL | [`Numeric`] |
//! | CHAR, VARCHAR | `String`, `&str` |
//! | BINARY, VARBINARY | `Vec<u8>`, `bytes::Bytes` |
//! | DATE, TIME, TIMESTAMP | `chrono::NaiveDate`, `NaiveTime`, `NaiveDateTime` |
//! | TIMESTAMP WITH TIME ZONE | `chrono::DateTime<FixedOffset>` |
//! | BLOB, CLOB | [`Blob`], [`Clob`] or a stream |
//! | OTHER | any `serde::Serialize` |

pub mod batch;
pub mod coerce;
pub mod config;
pub mod connection;
pub mod constants;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod escape;
pub mod lob;
pub mod metadata;
pub mod params;
pub mod request;
pub mod row;
pub mod statement;
pub mod types;
pub mod value;
pub mod warning;

// Re-export commonly used types
pub use batch::BatchOutcome;
pub use config::{Config, Protocol};
pub use connection::{Connection, Savepoint, StatementOptions};
pub use constants::{
    Concurrency, FetchOrientation, Holdability, IsolationLevel, ParameterMode, ResultSetType,
    SqlType, StatementReturnType,
};
pub use cursor::ResultSet;
pub use engine::{AttributeValue, Engine, EngineFactory, SessionAttribute};
pub use error::{Error, Result};
pub use metadata::{ColumnInfo, ParameterInfo, ParameterMetaData, ResultSetMetaData};
pub use request::{
    EngineFailure, GeneratedKeys, PreparedDescriptor, Request, Response, UpdateResult,
};
pub use row::{Row, RowSet};
pub use statement::PreparedStatement;
pub use types::{
    Blob, Clob, LobData, LobHandle, LobKind, LobSource, Numeric, ParameterType, SqlValue,
    StreamEncoding,
};
pub use value::Value;
pub use warning::{Warning, WarningChain};

// Re-export serde_json for users binding OTHER parameters
pub use serde_json;
