use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::config::{EntityDefinition, ModelConfig};
use super::entity::{EntityDescriptor, EntityId, InheritanceStrategy, DEFAULT_DISCRIMINATOR_COLUMN};
use super::errors::ModelError;
use super::field::{Cardinality, NavigationField, ScalarField};
use super::EntityModel;

/// Identifiers are emitted quoted, but only plain names are accepted so
/// metadata can never smuggle quote characters into generated SQL.
pub(crate) static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

fn validate_identifier(kind: &str, value: &str) -> Result<(), ModelError> {
    if IDENTIFIER_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ModelError::InvalidIdentifier {
            kind: kind.to_string(),
            value: value.to_string(),
        })
    }
}

/// Builds an immutable `EntityModel` from entity definitions.
///
/// Base definitions are built before derived ones regardless of input
/// order, so every derived descriptor refers to an already-validated base.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    definitions: Vec<EntityDefinition>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ModelConfig) -> Self {
        Self {
            definitions: config.entities,
        }
    }

    pub fn entity(mut self, definition: EntityDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn add(&mut self, definition: EntityDefinition) {
        self.definitions.push(definition);
    }

    pub fn build(self) -> Result<EntityModel, ModelError> {
        let ordered = order_by_inheritance(&self.definitions)?;
        let ids: HashMap<String, EntityId> = ordered
            .iter()
            .enumerate()
            .map(|(index, def)| (def.name.clone(), EntityId(index)))
            .collect();

        let mut entities: Vec<EntityDescriptor> = Vec::with_capacity(ordered.len());
        for (index, def) in ordered.iter().enumerate() {
            let descriptor = build_descriptor(EntityId(index), def, &entities, &ids)?;
            log::debug!(
                "Registered entity `{}` -> table `{}` ({:?}, base: {:?})",
                descriptor.name,
                descriptor.table_name,
                descriptor.strategy,
                descriptor.base
            );
            entities.push(descriptor);
        }

        let discriminators = index_discriminators(&entities)?;
        resolve_navigations(&mut entities)?;

        Ok(EntityModel::new(entities, ids, discriminators))
    }
}

/// Orders definitions so that every base precedes its derived types.
fn order_by_inheritance(
    definitions: &[EntityDefinition],
) -> Result<Vec<&EntityDefinition>, ModelError> {
    let mut by_name: HashMap<&str, &EntityDefinition> = HashMap::new();
    for def in definitions {
        if by_name.insert(def.name.as_str(), def).is_some() {
            return Err(ModelError::DuplicateEntity {
                entity: def.name.clone(),
            });
        }
    }

    let mut ordered = Vec::with_capacity(definitions.len());
    let mut placed: HashSet<&str> = HashSet::new();
    for def in definitions {
        let mut chain: Vec<&EntityDefinition> = Vec::new();
        let mut current = Some(def);
        while let Some(d) = current {
            if placed.contains(d.name.as_str()) {
                break;
            }
            if chain.iter().any(|c| c.name == d.name) {
                return Err(ModelError::InheritanceCycle {
                    entity: d.name.clone(),
                });
            }
            chain.push(d);
            current = match &d.base {
                Some(base) => Some(*by_name.get(base.as_str()).ok_or_else(|| {
                    ModelError::UnknownBase {
                        entity: d.name.clone(),
                        base: base.clone(),
                    }
                })?),
                None => None,
            };
        }
        for d in chain.into_iter().rev() {
            placed.insert(d.name.as_str());
            ordered.push(d);
        }
    }
    Ok(ordered)
}

/// Self first, then each ancestor up to the root
fn chain_of(entities: &[EntityDescriptor], id: EntityId) -> Vec<EntityId> {
    let mut chain = vec![id];
    let mut current = entities[id.0].base;
    while let Some(base) = current {
        chain.push(base);
        current = entities[base.0].base;
    }
    chain
}

fn build_descriptor(
    id: EntityId,
    def: &EntityDefinition,
    built: &[EntityDescriptor],
    ids: &HashMap<String, EntityId>,
) -> Result<EntityDescriptor, ModelError> {
    validate_identifier("entity", &def.name)?;

    let base = match &def.base {
        Some(name) => {
            let base_id = ids.get(name).ok_or_else(|| ModelError::UnknownBase {
                entity: def.name.clone(),
                base: name.clone(),
            })?;
            Some(&built[base_id.0])
        }
        None => None,
    };
    let ancestors: Vec<&EntityDescriptor> = match base {
        Some(b) => chain_of(built, b.id).into_iter().map(|a| &built[a.0]).collect(),
        None => Vec::new(),
    };

    let strategy = match (base, def.strategy) {
        (None, strategy) => strategy.unwrap_or_default(),
        (Some(b), None) => b.strategy,
        (Some(b), Some(found)) if found == b.strategy => found,
        (Some(b), Some(found)) => {
            return Err(ModelError::StrategyMismatch {
                entity: def.name.clone(),
                expected: b.strategy,
                found,
            })
        }
    };
    if let Some(b) = base {
        if strategy == InheritanceStrategy::None {
            return Err(ModelError::MissingStrategy {
                entity: b.name.clone(),
            });
        }
    }

    let table_name = match (strategy, base) {
        (InheritanceStrategy::SingleTable, Some(b)) => {
            let table = def.table.clone().unwrap_or_else(|| b.table_name.clone());
            if table != b.table_name {
                return Err(ModelError::SingleTableMismatch {
                    entity: def.name.clone(),
                    table,
                    base_table: b.table_name.clone(),
                });
            }
            table
        }
        _ => def.table.clone().unwrap_or_else(|| def.name.clone()),
    };
    validate_identifier("table", &table_name)?;

    if strategy == InheritanceStrategy::JoinedTable {
        if let Some(shared) = ancestors.iter().find(|a| a.table_name == table_name) {
            return Err(ModelError::SharedJoinedTable {
                entity: def.name.clone(),
                ancestor: shared.name.clone(),
                table: table_name,
            });
        }
    }

    let has_discriminator = def.discriminator_column.is_some() || def.discriminator_value.is_some();
    let (discriminator_column, discriminator_value) = match strategy {
        InheritanceStrategy::SingleTable => {
            let column = match base {
                Some(b) => b.discriminator_column.clone(),
                None => Some(
                    def.discriminator_column
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DISCRIMINATOR_COLUMN.to_string()),
                ),
            };
            if let Some(column) = &column {
                validate_identifier("discriminator column", column)?;
            }
            let value = if def.is_abstract {
                None
            } else {
                Some(
                    def.discriminator_value
                        .clone()
                        .unwrap_or_else(|| def.name.clone()),
                )
            };
            (column, value)
        }
        InheritanceStrategy::PerConcreteTable => {
            if has_discriminator {
                return Err(ModelError::DiscriminatorNotAllowed {
                    entity: def.name.clone(),
                });
            }
            (None, None)
        }
        InheritanceStrategy::None | InheritanceStrategy::JoinedTable => {
            if has_discriminator {
                log::warn!(
                    "Ignoring discriminator on `{}`: only single-table hierarchies use one",
                    def.name
                );
            }
            (None, None)
        }
    };

    let inherited: HashSet<&str> = ancestors
        .iter()
        .flat_map(|a| {
            a.scalar_fields
                .iter()
                .map(|f| f.name.as_str())
                .chain(a.navigation_fields.iter().map(|n| n.name.as_str()))
        })
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut scalar_fields = Vec::new();
    let mut navigation_fields = Vec::new();
    for field in &def.fields {
        validate_identifier("field", &field.name)?;
        if inherited.contains(field.name.as_str()) || !seen.insert(field.name.as_str()) {
            return Err(ModelError::DuplicateField {
                entity: def.name.clone(),
                field: field.name.clone(),
            });
        }

        match &field.navigation {
            Some(nav) => {
                if field.column.is_some() {
                    return Err(ModelError::ColumnOnNavigation {
                        entity: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                let target =
                    ids.get(&nav.target)
                        .ok_or_else(|| ModelError::UnknownNavigationTarget {
                            entity: def.name.clone(),
                            navigation: field.name.clone(),
                            target: nav.target.clone(),
                        })?;
                navigation_fields.push(NavigationField {
                    name: field.name.clone(),
                    target: *target,
                    foreign_key: nav.foreign_key.clone(),
                    cardinality: nav.cardinality,
                    inverse: nav.inverse.clone(),
                });
            }
            None => {
                let value_type = field.value_type.ok_or_else(|| ModelError::MissingValueType {
                    entity: def.name.clone(),
                    field: field.name.clone(),
                })?;
                let column = field.column.clone().unwrap_or_else(|| field.name.clone());
                validate_identifier("column", &column)?;
                if field.key && !value_type.can_be_key() {
                    return Err(ModelError::InvalidKeyType {
                        entity: def.name.clone(),
                        field: field.name.clone(),
                        value_type,
                    });
                }
                scalar_fields.push(ScalarField {
                    name: field.name.clone(),
                    column,
                    value_type,
                    is_key: field.key,
                    auto_increment: field.key && field.auto_increment,
                });
            }
        }
    }

    let declared_keys: Vec<&ScalarField> = scalar_fields.iter().filter(|f| f.is_key).collect();
    let key = match base {
        Some(b) => {
            if !declared_keys.is_empty() {
                return Err(ModelError::KeyRedeclared {
                    entity: def.name.clone(),
                });
            }
            b.key.clone()
        }
        None => match declared_keys.as_slice() {
            [] => {
                return Err(ModelError::MissingPrimaryKey {
                    entity: def.name.clone(),
                })
            }
            [key] => (*key).clone(),
            _ => {
                return Err(ModelError::MultipleKeys {
                    entity: def.name.clone(),
                })
            }
        },
    };

    Ok(EntityDescriptor {
        id,
        name: def.name.clone(),
        table_name,
        is_abstract: def.is_abstract,
        key,
        scalar_fields,
        navigation_fields,
        strategy,
        base: base.map(|b| b.id),
        discriminator_column,
        discriminator_value,
    })
}

/// (hierarchy root, discriminator value) → concrete type
fn index_discriminators(
    entities: &[EntityDescriptor],
) -> Result<HashMap<(EntityId, String), EntityId>, ModelError> {
    let mut index: HashMap<(EntityId, String), EntityId> = HashMap::new();
    for entity in entities {
        let Some(value) = &entity.discriminator_value else {
            continue;
        };
        let root = *chain_of(entities, entity.id).last().unwrap_or(&entity.id);
        if let Some(existing) = index.insert((root, value.clone()), entity.id) {
            return Err(ModelError::DuplicateDiscriminator {
                value: value.clone(),
                first: entities[existing.0].name.clone(),
                second: entity.name.clone(),
            });
        }
    }
    Ok(index)
}

fn lineage_has_scalar(entities: &[EntityDescriptor], id: EntityId, field: &str) -> bool {
    chain_of(entities, id)
        .into_iter()
        .any(|e| entities[e.0].declared_scalar(field).is_some())
}

fn lineage_navigation<'a>(
    entities: &'a [EntityDescriptor],
    id: EntityId,
    name: &str,
) -> Option<&'a NavigationField> {
    chain_of(entities, id)
        .into_iter()
        .find_map(|e| entities[e.0].declared_navigation(name))
}

/// Checks foreign keys and explicit inverses, then infers the missing
/// inverses: a navigation on the target with the same foreign key and the
/// opposite cardinality pointing back into the declaring hierarchy.
fn resolve_navigations(entities: &mut [EntityDescriptor]) -> Result<(), ModelError> {
    let mut inferred: Vec<(usize, usize, String)> = Vec::new();

    for entity in entities.iter() {
        let root = *chain_of(entities, entity.id).last().unwrap_or(&entity.id);
        for (nav_index, nav) in entity.navigation_fields.iter().enumerate() {
            let fk_owner = match nav.cardinality {
                Cardinality::Single => entity.id,
                Cardinality::Collection => nav.target,
            };
            if !lineage_has_scalar(entities, fk_owner, &nav.foreign_key) {
                return Err(ModelError::UnknownForeignKey {
                    entity: entity.name.clone(),
                    navigation: nav.name.clone(),
                    field: nav.foreign_key.clone(),
                    owner: entities[fk_owner.0].name.clone(),
                });
            }

            if let Some(inverse) = &nav.inverse {
                if lineage_navigation(entities, nav.target, inverse).is_none() {
                    return Err(ModelError::UnknownInverse {
                        entity: entity.name.clone(),
                        navigation: nav.name.clone(),
                        inverse: inverse.clone(),
                        target: entities[nav.target.0].name.clone(),
                    });
                }
                continue;
            }

            let candidates: Vec<&NavigationField> = chain_of(entities, nav.target)
                .into_iter()
                .flat_map(|t| entities[t.0].navigation_fields.iter())
                .filter(|candidate| {
                    let candidate_root = *chain_of(entities, candidate.target)
                        .last()
                        .unwrap_or(&candidate.target);
                    candidate.foreign_key == nav.foreign_key
                        && candidate_root == root
                        && candidate.cardinality != nav.cardinality
                })
                .collect();
            if let [inverse] = candidates.as_slice() {
                inferred.push((entity.id.0, nav_index, inverse.name.clone()));
            }
        }
    }

    for (entity_index, nav_index, inverse) in inferred {
        log::debug!(
            "Inferred inverse `{}` for navigation `{}.{}`",
            inverse,
            entities[entity_index].name,
            entities[entity_index].navigation_fields[nav_index].name
        );
        entities[entity_index].navigation_fields[nav_index].inverse = Some(inverse);
    }
    Ok(())
}
