use std::collections::HashMap;

use crate::sql_generator::SelectedColumn;
use crate::storage::StorageError;
use crate::value::{Value, ValueType};

/// Forward-only cursor over a result set
pub trait RowCursor {
    fn columns(&self) -> &[String];

    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool, StorageError>;

    fn is_null(&self, ordinal: usize) -> Result<bool, StorageError>;

    /// Value of the current row converted to `value_type`
    fn get(&self, ordinal: usize, value_type: ValueType) -> Result<Value, StorageError>;
}

/// Rows held in memory, as produced by the storage layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cell(&self, ordinal: usize) -> Result<&Value, StorageError> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or(StorageError::NoCurrentRow)?;
        row.get(ordinal).ok_or(StorageError::ColumnOutOfRange {
            ordinal,
            columns: self.columns.len(),
        })
    }
}

impl RowCursor for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool, StorageError> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, StorageError> {
        Ok(self.cell(ordinal)?.is_null())
    }

    fn get(&self, ordinal: usize, value_type: ValueType) -> Result<Value, StorageError> {
        let cell = self.cell(ordinal)?;
        cell.clone()
            .convert_to(value_type)
            .ok_or_else(|| StorageError::TypeMismatch {
                ordinal,
                expected: value_type,
                found: cell.to_string(),
            })
    }
}

/// Result column name → ordinal, computed once per result set
#[derive(Debug, Clone, Default)]
pub struct ColumnOrdinals {
    by_name: HashMap<String, usize>,
}

impl ColumnOrdinals {
    pub fn new(columns: &[String]) -> Self {
        let mut by_name = HashMap::with_capacity(columns.len());
        for (ordinal, name) in columns.iter().enumerate() {
            by_name.entry(name.clone()).or_insert(ordinal);
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Look up `<alias>_<column>` first, then the bare column name
    pub fn resolve(&self, column: &SelectedColumn) -> Option<usize> {
        self.get(&column.output_name(true))
            .or_else(|| self.get(&column.column))
    }
}
