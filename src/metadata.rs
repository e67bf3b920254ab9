//! Column and parameter descriptors
//!
//! Descriptors are produced by the engine at prepare time. The metadata
//! views built from them index columns and parameters from 1.

use std::sync::Arc;

use crate::constants::{ParameterMode, SqlType};
use crate::error::{Error, Result};
use crate::types::ParameterType;

/// Metadata for a column in a result set
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column label
    pub name: String,
    /// Underlying table, if the column maps to one
    pub table_name: Option<String>,
    /// Declared type
    pub column_type: ParameterType,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Whether the column is generated by the engine
    pub auto_increment: bool,
}

impl ColumnInfo {
    /// Create a nullable column with no precision bound
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            column_type: ParameterType::new(sql_type),
            nullable: true,
            auto_increment: false,
        }
    }

    /// Set the declared precision and scale
    pub fn with_precision(mut self, precision: u64, scale: u32) -> Self {
        self.column_type.precision = precision;
        self.column_type.scale = scale;
        self
    }

    /// Set the owning table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    /// Mark the column NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// SQL type of the column
    pub fn sql_type(&self) -> SqlType {
        self.column_type.sql_type
    }

    /// Check if this column is a LOB type
    pub fn is_lob(&self) -> bool {
        self.column_type.sql_type.is_lob()
    }
}

/// Metadata for a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Parameter name, when the statement names it
    pub name: Option<String>,
    /// Declared type
    pub param_type: ParameterType,
    /// Direction
    pub mode: ParameterMode,
    /// Whether NULL is accepted
    pub nullable: bool,
}

impl ParameterInfo {
    /// Create an unnamed, nullable parameter
    pub fn new(param_type: ParameterType, mode: ParameterMode) -> Self {
        Self {
            name: None,
            param_type,
            mode,
            nullable: true,
        }
    }

    /// Create an IN parameter of the given type
    pub fn input(sql_type: SqlType) -> Self {
        Self::new(ParameterType::new(sql_type), ParameterMode::In)
    }

    /// Set the parameter name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

fn column_index(index: usize, count: usize) -> Result<usize> {
    if index < 1 || index > count {
        return Err(Error::IndexOutOfRange { index, count });
    }
    Ok(index - 1)
}

/// Description of the columns a statement returns
#[derive(Debug, Clone)]
pub struct ResultSetMetaData {
    columns: Arc<[ColumnInfo]>,
}

impl ResultSetMetaData {
    /// Build from column descriptors
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns: columns.into(),
        }
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Descriptor of the column at a 1-based index
    pub fn column(&self, index: usize) -> Result<&ColumnInfo> {
        let pos = column_index(index, self.columns.len())?;
        Ok(&self.columns[pos])
    }

    /// Label of the column at a 1-based index
    pub fn column_name(&self, index: usize) -> Result<&str> {
        self.column(index).map(|c| c.name.as_str())
    }

    /// SQL type of the column at a 1-based index
    pub fn column_type(&self, index: usize) -> Result<SqlType> {
        self.column(index).map(ColumnInfo::sql_type)
    }

    /// Precision of the column at a 1-based index
    pub fn precision(&self, index: usize) -> Result<u64> {
        self.column(index).map(|c| c.column_type.precision)
    }

    /// Scale of the column at a 1-based index
    pub fn scale(&self, index: usize) -> Result<u32> {
        self.column(index).map(|c| c.column_type.scale)
    }

    /// Nullability of the column at a 1-based index
    pub fn is_nullable(&self, index: usize) -> Result<bool> {
        self.column(index).map(|c| c.nullable)
    }

    /// 1-based index of the column with the given label (case-insensitive)
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|pos| pos + 1)
    }

    /// All column descriptors
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }
}

/// Description of a statement's parameters
#[derive(Debug, Clone)]
pub struct ParameterMetaData {
    parameters: Arc<[ParameterInfo]>,
}

impl ParameterMetaData {
    /// Build from parameter descriptors
    pub fn new(parameters: Vec<ParameterInfo>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Descriptor of the parameter at a 1-based index
    pub fn parameter(&self, index: usize) -> Result<&ParameterInfo> {
        let pos = column_index(index, self.parameters.len())?;
        Ok(&self.parameters[pos])
    }

    /// SQL type of the parameter at a 1-based index
    pub fn parameter_type(&self, index: usize) -> Result<SqlType> {
        self.parameter(index).map(|p| p.param_type.sql_type)
    }

    /// Mode of the parameter at a 1-based index
    pub fn parameter_mode(&self, index: usize) -> Result<ParameterMode> {
        self.parameter(index).map(|p| p.mode)
    }

    /// Precision of the parameter at a 1-based index
    pub fn precision(&self, index: usize) -> Result<u64> {
        self.parameter(index).map(|p| p.param_type.precision)
    }

    /// Scale of the parameter at a 1-based index
    pub fn scale(&self, index: usize) -> Result<u32> {
        self.parameter(index).map(|p| p.param_type.scale)
    }

    /// 1-based index of the parameter with the given name (case-insensitive)
    pub fn find_parameter(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| {
                p.name
                    .as_deref()
                    .map(|n| n.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .map(|pos| pos + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_metadata_is_one_based() {
        let meta = ResultSetMetaData::new(vec![
            ColumnInfo::new("ID", SqlType::Integer).not_null(),
            ColumnInfo::new("NAME", SqlType::VarChar).with_precision(40, 0),
        ]);
        assert_eq!(meta.column_count(), 2);
        assert_eq!(meta.column_name(1).unwrap(), "ID");
        assert_eq!(meta.column_type(2).unwrap(), SqlType::VarChar);
        assert_eq!(meta.precision(2).unwrap(), 40);
        assert!(!meta.is_nullable(1).unwrap());
        assert!(matches!(
            meta.column(0),
            Err(Error::IndexOutOfRange { index: 0, count: 2 })
        ));
        assert!(meta.column(3).is_err());
        assert_eq!(meta.find_column("name"), Some(2));
    }

    #[test]
    fn test_parameter_metadata() {
        let meta = ParameterMetaData::new(vec![
            ParameterInfo::input(SqlType::Integer).with_name("ID"),
            ParameterInfo::new(
                ParameterType::with_precision(SqlType::Decimal, 10, 2),
                ParameterMode::Out,
            ),
        ]);
        assert_eq!(meta.parameter_count(), 2);
        assert_eq!(meta.parameter_mode(2).unwrap(), ParameterMode::Out);
        assert_eq!(meta.scale(2).unwrap(), 2);
        assert_eq!(meta.parameter(1).unwrap().name.as_deref(), Some("ID"));
        assert!(meta.parameter_type(5).is_err());
        assert_eq!(meta.find_parameter("id"), Some(1));
        assert_eq!(meta.find_parameter("TOTAL"), None);
    }
}
