//! Connection warnings
//!
//! Non-fatal degradations (a requested result property downgraded, a
//! granted property differing from the request) are appended to the
//! connection's warning chain instead of failing the call.

use std::fmt;

use crate::constants::sql_state;

/// A non-fatal condition reported by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Description of the condition
    pub message: String,
    /// SQLSTATE-style code
    pub sql_state: String,
    /// Vendor code, 0 when not applicable
    pub code: i32,
}

impl Warning {
    /// Create a warning with the given SQLSTATE
    pub fn new(message: impl Into<String>, sql_state: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: sql_state.into(),
            code: 0,
        }
    }

    /// Set the vendor code
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Warning for an option the engine or driver changed
    pub fn option_changed(message: impl Into<String>) -> Self {
        Self::new(message, sql_state::OPTION_VALUE_CHANGED)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.sql_state)
    }
}

/// Ordered warnings of a connection, oldest first
#[derive(Debug, Clone, Default)]
pub struct WarningChain {
    warnings: Vec<Warning>,
}

impl WarningChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a warning
    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Oldest warning, if any
    pub fn first(&self) -> Option<&Warning> {
        self.warnings.first()
    }

    /// Iterate in the order the warnings were added
    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    /// Number of warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if there are no warnings
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Remove all warnings
    pub fn clear(&mut self) {
        self.warnings.clear();
    }

    /// Copy of the current warnings
    pub fn to_vec(&self) -> Vec<Warning> {
        self.warnings.clone()
    }
}
