//! # Inheritance-Aware SQL Generation
//!
//! Turns entity descriptors plus a `QuerySpec` into dialect SQL and a
//! name → value parameter map. Every operation dispatches on the target's
//! `InheritanceStrategy`:
//!
//! - **None / single-table**: one physical table; single-table reads filter
//!   on the discriminator (IN-list for abstract targets) and writes store or
//!   guard it.
//! - **Joined-table**: the target table INNER JOINs every ancestor table on
//!   the key and LEFT JOINs every descendant table. Writes fan out per table.
//! - **Per-concrete-table**: polymorphic reads become a UNION ALL of one
//!   SELECT per concrete table, padded with NULLs and tagged with the
//!   concrete type name. Ordering and pagination wrap the union.
//!
//! Eager-load paths add LEFT JOINs aliased `j0`, `j1`, ... in shallowest
//! first order. Once more than one table participates every output column
//! is named `<tableAlias>_<column>`.

mod aliases;
mod ddl;
mod dialect;
pub mod errors;
pub mod read_plan;
mod select;
pub mod statement;
mod write;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use aliases::TableAliases;
pub use dialect::{qualified_column, AnsiDialect, Dialect, DialectKind, SqliteDialect};
pub use errors::GenerationError;
pub use read_plan::{
    AliasGroup, ColumnRole, EagerJoin, HierarchyShape, InverseLink, ReadPlan, SelectedColumn,
    TYPE_TAG_COLUMN,
};
pub use statement::{SelectQuery, ToSql};
pub use write::{WriteKind, WriteStatement};

use crate::config::EngineConfig;
use crate::model::{EntityId, EntityModel};
use crate::predicate::Expr;
use crate::query::{IncludePath, QuerySpec};
use crate::value::{KeyValue, Params, Value};

pub const DEFAULT_ROOT_ALIAS: &str = "t";
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 8;

/// A compiled SELECT together with the plan needed to read its rows
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Params,
    pub plan: ReadPlan,
}

#[derive(Debug, Clone)]
pub struct SqlGenerator {
    model: Arc<EntityModel>,
    dialect: Arc<dyn Dialect>,
    root_alias: String,
    max_include_depth: usize,
    log_statements: bool,
}

impl SqlGenerator {
    pub fn new(model: Arc<EntityModel>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            model,
            dialect,
            root_alias: DEFAULT_ROOT_ALIAS.to_string(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            log_statements: false,
        }
    }

    pub fn from_config(model: Arc<EntityModel>, config: &EngineConfig) -> Self {
        Self {
            model,
            dialect: config.dialect.create(),
            root_alias: config.root_alias.clone(),
            max_include_depth: config.max_include_depth,
            log_statements: config.log_statements,
        }
    }

    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    fn log_statement(&self, sql: &str) {
        if self.log_statements {
            log::info!("{}", sql);
        } else {
            log::debug!("{}", sql);
        }
    }

    /// Plan and render a read over `spec.entity`
    pub fn select(&self, spec: &QuerySpec) -> Result<CompiledQuery, GenerationError> {
        let target = self.model.require(&spec.entity)?.id;
        let alias = spec.alias.as_deref().unwrap_or(&self.root_alias);
        let plan = read_plan::plan_read(
            &self.model,
            target,
            alias,
            &spec.includes,
            self.max_include_depth,
        )?;
        let (query, params) = select::build_select(&self.model, self.dialect(), &plan, spec)?;
        let sql = query.to_sql(self.dialect());
        self.log_statement(&sql);
        Ok(CompiledQuery { sql, params, plan })
    }

    pub fn select_by_key(
        &self,
        entity: &str,
        key: &KeyValue,
        includes: &[IncludePath],
    ) -> Result<CompiledQuery, GenerationError> {
        let descriptor = self.model.require(entity)?;
        let mut spec = QuerySpec::new(entity)
            .filter(Expr::field(descriptor.key.name.clone()).eq(key.to_value()));
        spec.includes = includes.to_vec();
        self.select(&spec)
    }

    pub fn insert(
        &self,
        entity: EntityId,
        values: &BTreeMap<String, Value>,
    ) -> Result<Vec<WriteStatement>, GenerationError> {
        let statements = write::insert_statements(&self.model, self.dialect(), entity, values)?;
        statements.iter().for_each(|s| self.log_statement(&s.sql));
        Ok(statements)
    }

    pub fn update(
        &self,
        entity: EntityId,
        values: &BTreeMap<String, Value>,
    ) -> Result<Vec<WriteStatement>, GenerationError> {
        let statements = write::update_statements(&self.model, self.dialect(), entity, values)?;
        statements.iter().for_each(|s| self.log_statement(&s.sql));
        Ok(statements)
    }

    pub fn delete(
        &self,
        entity: EntityId,
        key: &KeyValue,
    ) -> Result<Vec<WriteStatement>, GenerationError> {
        let statements = write::delete_statements(&self.model, self.dialect(), entity, key)?;
        statements.iter().for_each(|s| self.log_statement(&s.sql));
        Ok(statements)
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table the model maps
    pub fn create_schema(&self) -> Vec<String> {
        let statements = ddl::create_schema(&self.model, self.dialect());
        statements.iter().for_each(|s| self.log_statement(s));
        statements
    }
}
