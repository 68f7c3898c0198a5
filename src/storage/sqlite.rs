use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Statement};

use super::{StorageConnection, StorageError};
use crate::materializer::{BufferedRows, RowCursor};
use crate::value::{KeyValue, Params, Value};

/// `StorageConnection` over a rusqlite connection
pub struct SqliteConnection {
    connection: Connection,
    path: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteConnection {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let display = path.as_ref().display().to_string();
        let connection = Connection::open(path.as_ref()).map_err(|e| StorageError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;
        Self::configure(connection, display)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let connection = Connection::open_in_memory().map_err(|e| StorageError::Open {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Self::configure(connection, ":memory:".to_string())
    }

    fn configure(connection: Connection, path: String) -> Result<Self, StorageError> {
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StorageError::Open {
                path: path.clone(),
                message: e.to_string(),
            })?;
        log::info!("Opened SQLite database {}", path);
        Ok(Self { connection, path })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn prepare(&self, sql: &str, params: &Params) -> Result<Statement<'_>, StorageError> {
        let mut statement = self
            .connection
            .prepare(sql)
            .map_err(|e| StorageError::execution_with_context(sql, e))?;
        for (name, value) in params {
            // parameters the statement does not reference are ignored
            let index = statement
                .parameter_index(name)
                .map_err(|e| StorageError::execution_with_context(sql, e))?;
            if let Some(index) = index {
                statement
                    .raw_bind_parameter(index, to_sql_value(value))
                    .map_err(|e| StorageError::execution_with_context(sql, e))?;
            }
        }
        Ok(statement)
    }

    fn batch(&self, operation: &str) -> Result<(), StorageError> {
        self.connection
            .execute_batch(operation)
            .map_err(|e| StorageError::Transaction {
                operation: operation.to_string(),
                message: e.to_string(),
            })
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(i),
        SqlValue::Real(r) => Value::Real(r),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Blob(b),
    }
}

impl StorageConnection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<usize, StorageError> {
        let mut statement = self.prepare(sql, params)?;
        statement
            .raw_execute()
            .map_err(|e| StorageError::execution_with_context(sql, e))
    }

    fn insert(&mut self, sql: &str, params: &Params) -> Result<Option<KeyValue>, StorageError> {
        self.execute(sql, params)?;
        Ok(Some(KeyValue::Integer(self.connection.last_insert_rowid())))
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Box<dyn RowCursor>, StorageError> {
        let mut statement = self.prepare(sql, params)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut buffered = Vec::new();
        let mut rows = statement.raw_query();
        while let Some(row) = rows
            .next()
            .map_err(|e| StorageError::execution_with_context(sql, e))?
        {
            let mut values = Vec::with_capacity(width);
            for ordinal in 0..width {
                let value: SqlValue = row
                    .get(ordinal)
                    .map_err(|e| StorageError::execution_with_context(sql, e))?;
                values.push(from_sql_value(value));
            }
            buffered.push(values);
        }
        log::debug!("Query returned {} row(s)", buffered.len());
        Ok(Box::new(BufferedRows::new(columns, buffered)))
    }

    fn begin(&mut self) -> Result<(), StorageError> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.batch("ROLLBACK")
    }
}
