//! INSERT / UPDATE / DELETE generation.
//!
//! Joined-table writes fan out into one statement per hierarchy table:
//! root first for INSERT and UPDATE, leaf first for DELETE.

use std::collections::BTreeMap;

use super::dialect::Dialect;
use super::errors::GenerationError;
use crate::model::{EntityDescriptor, EntityId, EntityModel, InheritanceStrategy};
use crate::value::{KeyValue, Params, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteStatement {
    pub kind: WriteKind,
    pub table: String,
    pub sql: String,
    pub params: Params,
    /// The storage engine generates the key on this INSERT
    pub generates_key: bool,
    /// Parameter to overwrite with the key generated by an earlier
    /// statement of the same batch
    pub key_parameter: Option<String>,
}

/// One physical table written for an entity, with the types whose own
/// fields it stores
struct TablePart {
    table: String,
    owners: Vec<EntityId>,
}

fn table_parts(model: &EntityModel, entity: EntityId) -> Vec<TablePart> {
    let descriptor = model.entity(entity);
    match descriptor.strategy {
        InheritanceStrategy::JoinedTable => model
            .lineage(entity)
            .into_iter()
            .map(|owner| TablePart {
                table: model.entity(owner).table_name.clone(),
                owners: vec![owner],
            })
            .collect(),
        InheritanceStrategy::None
        | InheritanceStrategy::SingleTable
        | InheritanceStrategy::PerConcreteTable => vec![TablePart {
            table: descriptor.table_name.clone(),
            owners: model.lineage(entity),
        }],
    }
}

fn require_concrete(descriptor: &EntityDescriptor) -> Result<(), GenerationError> {
    if descriptor.is_abstract {
        return Err(GenerationError::AbstractEntity {
            entity: descriptor.name.clone(),
        });
    }
    Ok(())
}

fn value_of(values: &BTreeMap<String, Value>, field: &str) -> Value {
    values.get(field).cloned().unwrap_or(Value::Null)
}

/// `(column, parameter, value)` for every non-key field stored in `part`
fn field_bindings(
    model: &EntityModel,
    dialect: &dyn Dialect,
    part: &TablePart,
    values: &BTreeMap<String, Value>,
) -> Vec<(String, String, Value)> {
    part.owners
        .iter()
        .flat_map(|owner| model.entity(*owner).own_non_key_fields())
        .map(|field| {
            (
                field.column.clone(),
                dialect.parameter(&field.name),
                value_of(values, &field.name),
            )
        })
        .collect()
}

/// `(column, parameter, value)` of the discriminator, single-table only
fn discriminator_binding(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
) -> Option<(String, String, Value)> {
    if descriptor.strategy != InheritanceStrategy::SingleTable {
        return None;
    }
    let value = descriptor.discriminator_value.clone()?;
    Some((
        descriptor.discriminator().to_string(),
        dialect.parameter("Discriminator"),
        Value::Text(value),
    ))
}

pub(crate) fn insert_statements(
    model: &EntityModel,
    dialect: &dyn Dialect,
    entity: EntityId,
    values: &BTreeMap<String, Value>,
) -> Result<Vec<WriteStatement>, GenerationError> {
    let descriptor = model.entity(entity);
    require_concrete(descriptor)?;

    let key = &descriptor.key;
    let key_value = value_of(values, &key.name);
    let generated = key_value.is_null();
    if generated && !key.auto_increment {
        return Err(GenerationError::MissingKeyValue {
            entity: descriptor.name.clone(),
            field: key.name.clone(),
        });
    }
    let key_parameter = dialect.parameter(&key.name);

    let mut statements = Vec::new();
    for (index, part) in table_parts(model, entity).iter().enumerate() {
        let first = index == 0;
        let mut bindings = Vec::new();
        if !(first && generated) {
            bindings.push((key.column.clone(), key_parameter.clone(), key_value.clone()));
        }
        bindings.extend(field_bindings(model, dialect, part, values));
        if first {
            bindings.extend(discriminator_binding(dialect, descriptor));
        }

        let table = dialect.quote_identifier(&part.table);
        let sql = if bindings.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns: Vec<String> = bindings
                .iter()
                .map(|(column, _, _)| dialect.quote_identifier(column))
                .collect();
            let placeholders: Vec<&str> = bindings.iter().map(|(_, p, _)| p.as_str()).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        statements.push(WriteStatement {
            kind: WriteKind::Insert,
            table: part.table.clone(),
            sql,
            params: bindings.into_iter().map(|(_, p, v)| (p, v)).collect(),
            generates_key: first && generated,
            key_parameter: (!first && generated).then(|| key_parameter.clone()),
        });
    }
    Ok(statements)
}

fn key_condition(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    model: &EntityModel,
    values: &BTreeMap<String, Value>,
    params: &mut Params,
) -> Result<String, GenerationError> {
    let key = &model.entity(model.root_of(descriptor.id)).key;
    let key_value = value_of(values, &key.name);
    if key_value.is_null() {
        return Err(GenerationError::MissingKeyValue {
            entity: descriptor.name.clone(),
            field: key.name.clone(),
        });
    }
    let parameter = dialect.parameter(&key.name);
    params.insert(parameter.clone(), key_value);
    Ok(format!(
        "{} = {}",
        dialect.quote_identifier(&key.column),
        parameter
    ))
}

fn guarded_where(
    dialect: &dyn Dialect,
    descriptor: &EntityDescriptor,
    key_condition: String,
    params: &mut Params,
) -> String {
    match discriminator_binding(dialect, descriptor) {
        Some((column, parameter, value)) => {
            params.insert(parameter.clone(), value);
            format!(
                "{} AND {} = {}",
                key_condition,
                dialect.quote_identifier(&column),
                parameter
            )
        }
        None => key_condition,
    }
}

pub(crate) fn update_statements(
    model: &EntityModel,
    dialect: &dyn Dialect,
    entity: EntityId,
    values: &BTreeMap<String, Value>,
) -> Result<Vec<WriteStatement>, GenerationError> {
    let descriptor = model.entity(entity);
    require_concrete(descriptor)?;

    let mut statements = Vec::new();
    for part in table_parts(model, entity) {
        let bindings = field_bindings(model, dialect, &part, values);
        if bindings.is_empty() {
            continue;
        }
        let mut params = Params::new();
        let condition = key_condition(dialect, descriptor, model, values, &mut params)?;
        let condition = guarded_where(dialect, descriptor, condition, &mut params);

        let assignments: Vec<String> = bindings
            .iter()
            .map(|(column, parameter, _)| {
                format!("{} = {}", dialect.quote_identifier(column), parameter)
            })
            .collect();
        params.extend(bindings.into_iter().map(|(_, p, v)| (p, v)));

        statements.push(WriteStatement {
            kind: WriteKind::Update,
            table: part.table.clone(),
            sql: format!(
                "UPDATE {} SET {} WHERE {}",
                dialect.quote_identifier(&part.table),
                assignments.join(", "),
                condition
            ),
            params,
            generates_key: false,
            key_parameter: None,
        });
    }
    Ok(statements)
}

pub(crate) fn delete_statements(
    model: &EntityModel,
    dialect: &dyn Dialect,
    entity: EntityId,
    key: &KeyValue,
) -> Result<Vec<WriteStatement>, GenerationError> {
    let descriptor = model.entity(entity);
    require_concrete(descriptor)?;

    let key_field = &model.entity(model.root_of(entity)).key;
    let values = BTreeMap::from([(key_field.name.clone(), key.to_value())]);

    let mut statements = Vec::new();
    for part in table_parts(model, entity).into_iter().rev() {
        let mut params = Params::new();
        let condition = key_condition(dialect, descriptor, model, &values, &mut params)?;
        let condition = guarded_where(dialect, descriptor, condition, &mut params);
        statements.push(WriteStatement {
            kind: WriteKind::Delete,
            table: part.table.clone(),
            sql: format!(
                "DELETE FROM {} WHERE {}",
                dialect.quote_identifier(&part.table),
                condition
            ),
            params,
            generates_key: false,
            key_parameter: None,
        });
    }
    Ok(statements)
}
