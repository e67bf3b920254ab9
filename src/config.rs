//! Connection configuration and connection string parsing
//!
//! Connection strings have the form
//! `[sqlbridge:]<protocol>:<database>[;key=value]*`, for example:
//! - `mem:test`
//! - `file:/var/db/app;user=APP;password=secret`
//! - `sqlbridge:mem:test;auto_commit=false;time_zone=+02:00`
//!
//! Keys this layer does not interpret are kept in [`Config::properties`]
//! for the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::constants::{Holdability, IsolationLevel};
use crate::error::{Error, Result};
use crate::types::parse_offset;

/// Default user name
pub const DEFAULT_USER: &str = "SA";

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional connection string prefix
const URL_PREFIX: &str = "sqlbridge:";

/// Where the engine keeps the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// In-memory database
    #[default]
    Mem,
    /// File-backed database
    File,
    /// Read-only database packaged as a resource
    Res,
}

impl Protocol {
    /// Connection string name of the protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Mem => "mem",
            Protocol::File => "file",
            Protocol::Res => "res",
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mem" => Ok(Protocol::Mem),
            "file" => Ok(Protocol::File),
            "res" => Ok(Protocol::Res),
            other => Err(Error::InvalidConnectionString(format!(
                "unknown protocol: {}",
                other
            ))),
        }
    }
}

/// Connection configuration
///
/// # Examples
///
/// ```rust
/// use sqlbridge::Config;
///
/// let config = Config::new("test")
///     .credentials("APP", "secret")
///     .auto_commit(false)
///     .fetch_size(100);
/// assert_eq!(config.database(), "test");
/// assert!(!config.auto_commit);
/// ```
///
/// ```rust
/// use sqlbridge::Config;
///
/// let config: Config = "file:/var/db/app;user=APP;read_only=true".parse().unwrap();
/// assert_eq!(config.username, "APP");
/// assert!(config.read_only);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage protocol
    pub protocol: Protocol,
    /// Database name or path
    database: String,
    /// User name
    pub username: String,
    /// Password (not shown by `Display`)
    password: String,
    /// Auto-commit mode of new connections
    pub auto_commit: bool,
    /// Read-only mode of new connections
    pub read_only: bool,
    /// Isolation level applied on connect, engine default when unset
    pub isolation: Option<IsolationLevel>,
    /// Default result holdability
    pub holdability: Holdability,
    /// Default fetch size of new statements (0 = engine decides)
    pub fetch_size: u32,
    /// Default row limit of new statements (0 = unlimited)
    pub max_rows: u64,
    /// Zone of the session, used for temporal values without an offset
    pub session_zone: FixedOffset,
    /// Time allowed for the engine factory to open a session
    pub connect_timeout: Duration,
    /// Properties passed through to the engine
    pub properties: BTreeMap<String, String>,
}

impl Config {
    /// Create an in-memory database configuration with defaults
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Set the storage protocol
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set user name and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set auto-commit mode
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Set read-only mode
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the isolation level applied on connect
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Set default holdability
    pub fn holdability(mut self, holdability: Holdability) -> Self {
        self.holdability = holdability;
        self
    }

    /// Set default fetch size
    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Set default row limit
    pub fn max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Set the session zone
    pub fn session_zone(mut self, zone: FixedOffset) -> Self {
        self.session_zone = zone;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add an engine property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Database name or path
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Password, for engine authentication
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Set the password
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Apply one `key=value` pair from a connection string
    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "user" => self.username = value.to_string(),
            "password" => self.password = value.to_string(),
            "auto_commit" | "autocommit" => self.auto_commit = parse_bool(key, value)?,
            "read_only" | "readonly" => self.read_only = parse_bool(key, value)?,
            "isolation" => self.isolation = Some(parse_isolation(value)?),
            "holdability" => {
                self.holdability = match value.to_ascii_lowercase().as_str() {
                    "hold" => Holdability::HoldOverCommit,
                    "close" => Holdability::CloseAtCommit,
                    _ => return Err(invalid_value(key, value)),
                }
            }
            "fetch_size" => self.fetch_size = value.parse().map_err(|_| invalid_value(key, value))?,
            "max_rows" => self.max_rows = value.parse().map_err(|_| invalid_value(key, value))?,
            "time_zone" => {
                self.session_zone = parse_offset(value).map_err(|_| invalid_value(key, value))?
            }
            "connect_timeout" => {
                let secs: u64 = value.parse().map_err(|_| invalid_value(key, value))?;
                self.connect_timeout = Duration::from_secs(secs);
            }
            _ => {
                self.properties.insert(key.to_string(), value.to_string());
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: Protocol::Mem,
            database: String::new(),
            username: DEFAULT_USER.to_string(),
            password: String::new(),
            auto_commit: true,
            read_only: false,
            isolation: None,
            holdability: Holdability::HoldOverCommit,
            fetch_size: 0,
            max_rows: 0,
            session_zone: Utc.fix(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            properties: BTreeMap::new(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid_value(key, value)),
    }
}

fn parse_isolation(value: &str) -> Result<IsolationLevel> {
    match value.to_ascii_uppercase().replace('_', " ").as_str() {
        "READ UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
        "READ COMMITTED" => Ok(IsolationLevel::ReadCommitted),
        "REPEATABLE READ" => Ok(IsolationLevel::RepeatableRead),
        "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
        _ => Err(invalid_value("isolation", value)),
    }
}

fn invalid_value(key: &str, value: &str) -> Error {
    Error::InvalidConnectionString(format!("invalid value for {}: {}", key, value))
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let has_prefix = s
            .get(..URL_PREFIX.len())
            .map(|p| p.eq_ignore_ascii_case(URL_PREFIX))
            .unwrap_or(false);
        let s = if has_prefix { &s[URL_PREFIX.len()..] } else { s };

        if s.is_empty() {
            return Err(Error::InvalidConnectionString(
                "empty connection string".to_string(),
            ));
        }

        let mut segments = s.split(';');
        let location = segments.next().unwrap_or_default();
        let (protocol, database) = location.split_once(':').ok_or_else(|| {
            Error::InvalidConnectionString(format!("missing protocol in {}", location))
        })?;

        if database.is_empty() {
            return Err(Error::InvalidConnectionString(
                "missing database name".to_string(),
            ));
        }

        let mut config = Config::new(database).protocol(protocol.parse()?);

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                Error::InvalidConnectionString(format!("expected key=value, got {}", segment))
            })?;
            config.apply(key.trim(), value.trim())?;
        }

        Ok(config)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{};user={}",
            self.protocol.as_str(),
            self.database,
            self.username
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config: Config = "mem:test".parse().unwrap();
        assert_eq!(config.protocol, Protocol::Mem);
        assert_eq!(config.database(), "test");
        assert_eq!(config.username, DEFAULT_USER);
        assert_eq!(config.password(), "");
        assert!(config.auto_commit);
        assert!(!config.read_only);
        assert_eq!(config.session_zone.local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_with_prefix_and_properties() {
        let config: Config =
            "sqlbridge:file:/var/db/app;user=APP;password=secret;auto_commit=false;cache=large;"
                .parse()
                .unwrap();
        assert_eq!(config.protocol, Protocol::File);
        assert_eq!(config.database(), "/var/db/app");
        assert_eq!(config.username, "APP");
        assert_eq!(config.password(), "secret");
        assert!(!config.auto_commit);
        assert_eq!(config.properties.get("cache").map(String::as_str), Some("large"));
    }

    #[test]
    fn test_parse_session_options() {
        let config: Config =
            "mem:t;holdability=close;fetch_size=50;max_rows=10;time_zone=+02:00;isolation=serializable;connect_timeout=3"
                .parse()
                .unwrap();
        assert_eq!(config.holdability, Holdability::CloseAtCommit);
        assert_eq!(config.fetch_size, 50);
        assert_eq!(config.max_rows, 10);
        assert_eq!(config.session_zone.local_minus_utc(), 7200);
        assert_eq!(config.isolation, Some(IsolationLevel::Serializable));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Config>().is_err());
        assert!("test".parse::<Config>().is_err());
        assert!("mem:".parse::<Config>().is_err());
        assert!("tcp:test".parse::<Config>().is_err());
        assert!("mem:test;user".parse::<Config>().is_err());
        assert!("mem:test;auto_commit=maybe".parse::<Config>().is_err());
        assert!("mem:test;fetch_size=-1".parse::<Config>().is_err());
    }

    #[test]
    fn test_display_hides_password() {
        let config = Config::new("test").credentials("APP", "secret");
        let shown = config.to_string();
        assert_eq!(shown, "mem:test;user=APP");
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = Config::new("db")
            .protocol(Protocol::Res)
            .read_only(true)
            .max_rows(5)
            .connect_timeout(Duration::from_secs(30))
            .property("shutdown", "true");

        assert_eq!(config.protocol, Protocol::Res);
        assert!(config.read_only);
        assert_eq!(config.max_rows, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.properties.len(), 1);
    }
}
