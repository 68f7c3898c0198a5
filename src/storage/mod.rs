//! Storage engine boundary.
//!
//! The unit of work only talks to a `StorageConnection`: statements go in
//! with their named parameter map, rows come back through a `RowCursor`.
//! The bundled SQLite engine lives behind the `sqlite` feature.

pub mod errors;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use errors::StorageError;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;

use crate::materializer::RowCursor;
use crate::value::{KeyValue, Params};

pub trait StorageConnection {
    /// Run a statement that returns no rows. Returns the affected row count.
    fn execute(&mut self, sql: &str, params: &Params) -> Result<usize, StorageError>;

    /// Run an INSERT and report the key the engine generated for the row,
    /// if any
    fn insert(&mut self, sql: &str, params: &Params) -> Result<Option<KeyValue>, StorageError>;

    fn query(&mut self, sql: &str, params: &Params) -> Result<Box<dyn RowCursor>, StorageError>;

    fn begin(&mut self) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn rollback(&mut self) -> Result<(), StorageError>;
}
