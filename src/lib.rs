//! Relmap - object-relational mapping core
//!
//! This crate maps typed entity hierarchies onto relational tables through:
//! - Entity metadata with None, single-table, joined-table and
//!   per-concrete-table inheritance
//! - Inheritance-aware SQL generation (SELECT, INSERT, UPDATE, DELETE, DDL)
//! - Parameterized predicate translation
//! - An identity map with change tracking
//! - Join-based materialization with relationship fixup
//! - A unit of work that writes pending changes in one transaction

pub mod config;
pub mod materializer;
pub mod model;
pub mod predicate;
pub mod query;
pub mod sql_generator;
pub mod storage;
pub mod tracking;
pub mod unit_of_work;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use config::{ConfigError, EngineConfig};
pub use materializer::{Materializer, RowCursor};
pub use model::{EntityDefinition, EntityModel, InheritanceStrategy, ModelBuilder, ModelConfig};
pub use predicate::Expr;
pub use query::{IncludePath, QuerySpec, SortDirection};
pub use sql_generator::{AnsiDialect, Dialect, DialectKind, SqlGenerator, SqliteDialect};
#[cfg(feature = "sqlite")]
pub use storage::SqliteConnection;
pub use storage::StorageConnection;
pub use tracking::{ChangeTracker, EntityObject, EntityState, ObjectId};
pub use unit_of_work::{OrmError, UnitOfWork};
pub use value::{KeyValue, Value, ValueType};
