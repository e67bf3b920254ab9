//! Result rows
//!
//! The engine materializes a tabular result in full before answering, so a
//! [`RowSet`] is simply the column descriptors plus every row. Column
//! access on a [`Row`] is 1-based.

use std::sync::Arc;

use crate::metadata::ColumnInfo;
use crate::types::{Numeric, SqlValue};

/// A row from a query result
///
/// # Example
///
/// ```rust
/// use sqlbridge::{Row, SqlValue};
///
/// let row = Row::new(vec![SqlValue::Integer(7), SqlValue::Char("seven".into())]);
/// assert_eq!(row.get_i64(1), Some(7));
/// assert_eq!(row.get_string(2), Some("seven"));
/// assert!(row.get(3).is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column values
    values: Vec<SqlValue>,
    /// Column labels, shared by every row of a result
    column_names: Option<Arc<[String]>>,
}

impl Row {
    /// Create a new row with values
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self {
            values,
            column_names: None,
        }
    }

    /// Create a new row with values and column labels
    pub fn with_names(values: Vec<SqlValue>, names: Arc<[String]>) -> Self {
        Self {
            values,
            column_names: Some(names),
        }
    }

    /// Get the number of columns in this row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by 1-based column index
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index.checked_sub(1)?)
    }

    /// Get a value by column label (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        let names = self.column_names.as_ref()?;
        let pos = names.iter().position(|n| n.eq_ignore_ascii_case(name))?;
        self.values.get(pos)
    }

    /// Get all values as a slice
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Consume the row and return the values
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Try to get a string value
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(SqlValue::as_str)
    }

    /// Try to get an integer value
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(SqlValue::as_i64)
    }

    /// Try to get a float value
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(SqlValue::as_f64)
    }

    /// Try to get an exact decimal value
    pub fn get_decimal(&self, index: usize) -> Option<&Numeric> {
        self.get(index).and_then(SqlValue::as_decimal)
    }

    /// Check if a column value is NULL (or the index is out of range)
    pub fn is_null(&self, index: usize) -> bool {
        self.get(index).map(SqlValue::is_null).unwrap_or(true)
    }
}

/// A fully materialized tabular result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column descriptors
    pub columns: Vec<ColumnInfo>,
    /// Rows in result order
    pub rows: Vec<Row>,
}

impl RowSet {
    /// Create a row set, labelling each row with the column names
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<SqlValue>>) -> Self {
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        let rows = rows
            .into_iter()
            .map(|values| Row::with_names(values, names.clone()))
            .collect();
        Self { columns, rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep at most `max_rows` rows; 0 keeps all
    pub fn truncate(&mut self, max_rows: u64) {
        if max_rows > 0 {
            let keep = usize::try_from(max_rows).unwrap_or(usize::MAX);
            self.rows.truncate(keep);
        }
    }
}
