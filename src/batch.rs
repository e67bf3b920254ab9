//! Batch accumulation and outcome
//!
//! A prepared statement in batching mode snapshots its parameter bindings
//! into a [`BatchBuffer`] on every `add_batch`. The buffer is sent to the
//! engine in one round trip, and the engine answers with a [`BatchOutcome`]:
//! one update count per entry executed, plus the failure that stopped it
//! early, if any.

use crate::error::{Error, Result};
use crate::params::Binding;
use crate::request::EngineFailure;

/// Pending batch entries of one statement
#[derive(Debug, Default)]
pub struct BatchBuffer {
    rows: Vec<Vec<Binding>>,
    column_count: usize,
    active: bool,
}

impl BatchBuffer {
    /// Create an inactive buffer for rows of `column_count` bindings
    pub fn new(column_count: usize) -> Self {
        Self {
            rows: Vec::new(),
            column_count,
            active: false,
        }
    }

    /// Check if the statement is in batching mode
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append a row, entering batching mode on the first call
    pub fn add_row(&mut self, row: Vec<Binding>) -> Result<()> {
        if row.len() != self.column_count {
            return Err(Error::Internal(format!(
                "batch row has {} values, expected {}",
                row.len(),
                self.column_count
            )));
        }
        self.active = true;
        self.rows.push(row);
        Ok(())
    }

    /// Number of pending rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows are pending
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take all pending rows and leave batching mode
    pub fn take(&mut self) -> Vec<Vec<Binding>> {
        self.active = false;
        std::mem::take(&mut self.rows)
    }

    /// Drop all pending rows and leave batching mode
    pub fn clear(&mut self) {
        self.active = false;
        self.rows.clear();
    }
}

/// Update counts reported by the engine for a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Update count of each entry executed, in order
    pub counts: Vec<u64>,
    /// Failure that stopped the batch, if any
    pub failure: Option<EngineFailure>,
}

impl BatchOutcome {
    /// Outcome with every entry executed
    pub fn success(counts: Vec<u64>) -> Self {
        Self {
            counts,
            failure: None,
        }
    }

    /// Outcome of a batch stopped by `failure` after `counts.len()` entries
    pub fn failed(counts: Vec<u64>, failure: EngineFailure) -> Self {
        Self {
            counts,
            failure: Some(failure),
        }
    }

    /// Total rows affected by the executed entries
    pub fn total_rows_affected(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Check if all `expected` entries executed without failure
    pub fn is_complete(&self, expected: usize) -> bool {
        self.failure.is_none() && self.counts.len() == expected
    }

    /// Convert to the per-entry counts, or a batch failure carrying the
    /// counts received so far
    pub fn into_counts(self, expected: usize) -> Result<Vec<u64>> {
        if self.counts.len() > expected {
            return Err(Error::Internal(format!(
                "engine reported {} counts for {} batch entries",
                self.counts.len(),
                expected
            )));
        }
        if self.is_complete(expected) {
            return Ok(self.counts);
        }

        let (code, sql_state, message) = match self.failure {
            Some(f) => (Some(f.code), Some(f.sql_state), f.message),
            None => (
                None,
                None,
                format!("engine returned {} of {} update counts", self.counts.len(), expected),
            ),
        };
        Err(Error::BatchFailure {
            counts: self.counts,
            expected,
            code,
            sql_state,
            message,
        })
    }
}
