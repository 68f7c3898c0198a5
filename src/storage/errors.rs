use thiserror::Error;

use crate::value::ValueType;

/// Failures reported by the storage engine. These pass through the unit of
/// work unchanged and trigger a rollback of the enclosing write-back.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Failed to open database `{path}`: {message}")]
    Open { path: String, message: String },
    #[error("Statement failed: {message}\n  SQL: {sql}")]
    Execution { sql: String, message: String },
    #[error("Transaction {operation} failed: {message}")]
    Transaction { operation: String, message: String },
    #[error("Column {ordinal} cannot be read as {expected} (found {found})")]
    TypeMismatch {
        ordinal: usize,
        expected: ValueType,
        found: String,
    },
    #[error("Column ordinal {ordinal} is out of range ({columns} columns)")]
    ColumnOutOfRange { ordinal: usize, columns: usize },
    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,
}

impl StorageError {
    /// Create an Execution error carrying the statement that failed
    pub fn execution_with_context(sql: impl Into<String>, message: impl ToString) -> Self {
        StorageError::Execution {
            sql: sql.into(),
            message: message.to_string(),
        }
    }
}
