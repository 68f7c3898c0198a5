//! CREATE TABLE statements derived from the entity model.

use super::dialect::Dialect;
use crate::model::{EntityDescriptor, EntityModel, InheritanceStrategy, ScalarField};

pub(crate) fn create_schema(model: &EntityModel, dialect: &dyn Dialect) -> Vec<String> {
    let mut statements = Vec::new();
    for entity in model.iter() {
        let columns = match entity.strategy {
            InheritanceStrategy::None => Some(lineage_columns(model, entity, dialect)),
            InheritanceStrategy::SingleTable if entity.is_root() => {
                Some(shared_table_columns(model, entity, dialect))
            }
            InheritanceStrategy::SingleTable => None,
            InheritanceStrategy::JoinedTable => Some(joined_table_columns(model, entity, dialect)),
            InheritanceStrategy::PerConcreteTable if !entity.is_abstract => {
                Some(lineage_columns(model, entity, dialect))
            }
            InheritanceStrategy::PerConcreteTable => None,
        };
        if let Some(columns) = columns {
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                dialect.quote_identifier(&entity.table_name),
                columns.join(", ")
            ));
        }
    }
    statements
}

fn column_definition(field: &ScalarField, dialect: &dyn Dialect) -> String {
    let sql_type = field.value_type.sql_type();
    if field.is_key {
        format!(
            "{} {}",
            dialect.quote_identifier(&field.column),
            dialect.key_column_type(sql_type, field.auto_increment)
        )
    } else {
        format!("{} {}", dialect.quote_identifier(&field.column), sql_type)
    }
}

/// Complete column set of a standalone or per-concrete-table type
fn lineage_columns(model: &EntityModel, entity: &EntityDescriptor, dialect: &dyn Dialect) -> Vec<String> {
    model
        .scalar_fields(entity.id)
        .into_iter()
        .map(|(_, field)| column_definition(field, dialect))
        .collect()
}

/// Root, every subtype and the discriminator in one table
fn shared_table_columns(
    model: &EntityModel,
    root: &EntityDescriptor,
    dialect: &dyn Dialect,
) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut columns = Vec::new();
    let owners = std::iter::once(root.id).chain(model.descendants(root.id));
    for owner in owners {
        for field in &model.entity(owner).scalar_fields {
            if seen.contains(&field.column.as_str()) {
                continue;
            }
            seen.push(&field.column);
            columns.push(column_definition(field, dialect));
        }
    }
    columns.push(format!(
        "{} TEXT NOT NULL",
        dialect.quote_identifier(root.discriminator())
    ));
    columns
}

/// Own fields only; subtype tables reference their base table by key
fn joined_table_columns(
    model: &EntityModel,
    entity: &EntityDescriptor,
    dialect: &dyn Dialect,
) -> Vec<String> {
    let mut columns = Vec::new();
    if let Some(base) = entity.base {
        let key = &entity.key;
        columns.push(format!(
            "{} {} REFERENCES {}({})",
            dialect.quote_identifier(&key.column),
            dialect.key_column_type(key.value_type.sql_type(), false),
            dialect.quote_identifier(&model.entity(base).table_name),
            dialect.quote_identifier(&key.column)
        ));
    }
    columns.extend(
        entity
            .scalar_fields
            .iter()
            .map(|field| column_definition(field, dialect)),
    );
    columns
}
