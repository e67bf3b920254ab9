//! Result set navigation
//!
//! The engine materializes a query result in full, so a [`ResultSet`] is a
//! position over an in-memory [`RowSet`]. Scrollable results allow every
//! [`FetchOrientation`]; forward-only results only move with `next`.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut rs = stmt.execute_query().await?;
//! while rs.next()? {
//!     let id = rs.row()?.get_i64(1);
//! }
//!
//! // Scrollable results can move anywhere
//! if rs.last()? {
//!     let total = rs.position();
//! }
//! ```

use std::sync::Arc;

use crate::constants::{Concurrency, FetchOrientation, Holdability, ResultSetType};
use crate::error::{Error, Result};
use crate::metadata::ResultSetMetaData;
use crate::row::{Row, RowSet};
use crate::types::SqlValue;

/// Rows of a query result with a cursor position
///
/// Positions are 1-based; 0 is before the first row and `len + 1` after
/// the last.
#[derive(Debug)]
pub struct ResultSet {
    rows: Vec<Row>,
    metadata: Arc<ResultSetMetaData>,
    result_set_type: ResultSetType,
    concurrency: Concurrency,
    holdability: Holdability,
    position: i64,
    closed: bool,
}

impl ResultSet {
    /// Create a result set positioned before the first row
    pub(crate) fn new(
        rows: RowSet,
        metadata: Arc<ResultSetMetaData>,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Self {
        Self {
            rows: rows.rows,
            metadata,
            result_set_type,
            concurrency,
            holdability,
            position: 0,
            closed: false,
        }
    }

    /// Column descriptors of the result
    pub fn metadata(&self) -> &Arc<ResultSetMetaData> {
        &self.metadata
    }

    /// Scrollability of the result
    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    /// Concurrency of the result
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Holdability of the result
    pub fn holdability(&self) -> Holdability {
        self.holdability
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current position (1-based, 0 means before the first row)
    pub fn position(&self) -> i64 {
        self.position
    }

    fn after_last_position(&self) -> i64 {
        self.rows.len() as i64 + 1
    }

    fn on_row(&self) -> bool {
        self.position >= 1 && self.position <= self.rows.len() as i64
    }

    /// Check if the cursor is before the first row of a non-empty result
    pub fn is_before_first(&self) -> bool {
        !self.rows.is_empty() && self.position == 0
    }

    /// Check if the cursor is after the last row of a non-empty result
    pub fn is_after_last(&self) -> bool {
        !self.rows.is_empty() && self.position == self.after_last_position()
    }

    /// Check if the cursor is on the first row
    pub fn is_first(&self) -> bool {
        self.on_row() && self.position == 1
    }

    /// Check if the cursor is on the last row
    pub fn is_last(&self) -> bool {
        self.on_row() && self.position == self.rows.len() as i64
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("result set closed".to_string()));
        }
        Ok(())
    }

    fn check_scrollable(&self, orientation: FetchOrientation) -> Result<()> {
        if !self.result_set_type.is_scrollable() && orientation != FetchOrientation::Next {
            return Err(Error::InvalidState(format!(
                "{:?} movement on a forward-only result set",
                orientation
            )));
        }
        Ok(())
    }

    /// Move the cursor
    ///
    /// `offset` is used by `Absolute` and `Relative` only. Returns true if
    /// the cursor ends up on a row.
    pub fn scroll(&mut self, orientation: FetchOrientation, offset: i64) -> Result<bool> {
        self.check_open()?;
        self.check_scrollable(orientation)?;

        let len = self.rows.len() as i64;
        let target = match orientation {
            FetchOrientation::Next => self.position.saturating_add(1),
            FetchOrientation::Prior => self.position.saturating_sub(1),
            FetchOrientation::First => 1,
            FetchOrientation::Last => len,
            FetchOrientation::Absolute if offset >= 0 => offset,
            FetchOrientation::Absolute => len.saturating_add(1).saturating_add(offset),
            FetchOrientation::Relative => self.position.saturating_add(offset),
        };

        self.position = if len == 0 {
            0
        } else {
            target.clamp(0, len + 1)
        };
        Ok(self.on_row())
    }

    /// Move to the next row
    pub fn next(&mut self) -> Result<bool> {
        self.scroll(FetchOrientation::Next, 0)
    }

    /// Move to the previous row
    pub fn previous(&mut self) -> Result<bool> {
        self.scroll(FetchOrientation::Prior, 0)
    }

    /// Move to the first row
    pub fn first(&mut self) -> Result<bool> {
        self.scroll(FetchOrientation::First, 0)
    }

    /// Move to the last row
    pub fn last(&mut self) -> Result<bool> {
        self.scroll(FetchOrientation::Last, 0)
    }

    /// Move to an absolute row; negative positions count back from the end
    pub fn absolute(&mut self, row: i64) -> Result<bool> {
        self.scroll(FetchOrientation::Absolute, row)
    }

    /// Move relative to the current row
    pub fn relative(&mut self, rows: i64) -> Result<bool> {
        self.scroll(FetchOrientation::Relative, rows)
    }

    /// Move before the first row
    pub fn before_first(&mut self) -> Result<()> {
        self.scroll(FetchOrientation::Absolute, 0).map(|_| ())
    }

    /// Move after the last row
    pub fn after_last(&mut self) -> Result<()> {
        let past = self.after_last_position();
        self.scroll(FetchOrientation::Absolute, past).map(|_| ())
    }

    /// Row under the cursor
    pub fn row(&self) -> Result<&Row> {
        self.check_open()?;
        if !self.on_row() {
            return Err(Error::InvalidState("cursor is not on a row".to_string()));
        }
        Ok(&self.rows[(self.position - 1) as usize])
    }

    /// Value of a 1-based column in the current row
    pub fn get(&self, column: usize) -> Result<&SqlValue> {
        let row = self.row()?;
        row.get(column).ok_or(Error::IndexOutOfRange {
            index: column,
            count: row.len(),
        })
    }

    /// Value of a named column in the current row
    pub fn get_by_name(&self, name: &str) -> Result<&SqlValue> {
        let index = self
            .metadata
            .find_column(name)
            .ok_or_else(|| Error::InvalidArgument(format!("no column named {}", name)))?;
        self.get(index)
    }

    /// Consume the result and return every row
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Close the result set
    pub fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }

    /// Check if the result set is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
