//! Read planning: which tables, aliases and columns a SELECT touches.
//!
//! The plan is shared by the SELECT builder and the materializer, so the
//! column aliases the statement emits and the ones the materializer looks
//! up always come from the same list.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::aliases::TableAliases;
use super::errors::GenerationError;
use crate::model::{Cardinality, EntityId, EntityModel, InheritanceStrategy, IDENTIFIER_PATTERN};
use crate::query::IncludePath;
use crate::value::ValueType;

static EAGER_ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^j[0-9]+$").unwrap());

/// Synthetic column carrying the concrete type name in union reads
pub const TYPE_TAG_COLUMN: &str = "_type";

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRole {
    /// Scalar field, identified by the type declaring it
    Field { owner: EntityId, name: String },
    /// Key column of a joined-table subtype table; non-NULL when the row
    /// has a part in that table
    TableKey(EntityId),
    Discriminator,
    TypeTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedColumn {
    pub table_alias: String,
    pub column: String,
    pub value_type: ValueType,
    pub role: ColumnRole,
}

impl SelectedColumn {
    /// `<tableAlias>_<column>` when several tables participate, the bare
    /// column name otherwise
    pub fn output_name(&self, aliased: bool) -> String {
        if aliased {
            format!("{}_{}", self.table_alias, self.column)
        } else {
            self.column.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyShape {
    /// One table holding exactly one type
    Plain,
    /// Shared table, runtime type read from the discriminator column
    Discriminated,
    /// Table per type, runtime type is the deepest table with a row
    Joined,
    /// UNION ALL of concrete tables, runtime type read from the type tag
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyTable {
    pub entity: EntityId,
    pub table_name: String,
    pub alias: String,
}

/// Every table and column selected for one entity occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct AliasGroup {
    pub entity: EntityId,
    pub alias: String,
    pub shape: HierarchyShape,
    /// Joined: own table, then ancestors, then descendants.
    /// Union: one entry per concrete table, all sharing `alias`.
    pub tables: Vec<HierarchyTable>,
    pub columns: Vec<SelectedColumn>,
}

impl AliasGroup {
    pub fn field_column(&self, owner: EntityId, name: &str) -> Option<&SelectedColumn> {
        self.columns.iter().find(|c| match &c.role {
            ColumnRole::Field { owner: o, name: n } => *o == owner && n == name,
            _ => false,
        })
    }

    pub fn role_column(&self, role: &ColumnRole) -> Option<&SelectedColumn> {
        self.columns.iter().find(|c| &c.role == role)
    }

    pub fn table(&self, alias: &str) -> Option<&HierarchyTable> {
        self.tables.iter().find(|t| t.alias == alias)
    }
}

/// Navigation on the joined entity pointing back at the parent
#[derive(Debug, Clone, PartialEq)]
pub struct InverseLink {
    pub name: String,
    pub cardinality: Cardinality,
    pub foreign_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EagerJoin {
    pub path: IncludePath,
    pub parent_alias: String,
    pub parent_entity: EntityId,
    pub navigation: String,
    pub cardinality: Cardinality,
    pub foreign_key: String,
    pub inverse: Option<InverseLink>,
    pub group: AliasGroup,
}

impl EagerJoin {
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadPlan {
    pub root: AliasGroup,
    /// Shallowest first; a join's parent always precedes it
    pub joins: Vec<EagerJoin>,
    /// Whether output columns carry `<alias>_<column>` names
    pub aliased: bool,
}

impl ReadPlan {
    pub fn output_name(&self, column: &SelectedColumn) -> String {
        column.output_name(self.aliased)
    }
}

pub(crate) fn plan_read(
    model: &EntityModel,
    target: EntityId,
    root_alias: &str,
    includes: &[IncludePath],
    max_depth: usize,
) -> Result<ReadPlan, GenerationError> {
    validate_root_alias(root_alias)?;
    let root = plan_group(model, target, root_alias)?;

    for path in includes {
        if path.depth() == 0 {
            return Err(GenerationError::InvalidIncludePath {
                path: path.to_string(),
                segment: String::new(),
            });
        }
        if let Some(segment) = path.segments().iter().find(|s| s.is_empty()) {
            return Err(GenerationError::InvalidIncludePath {
                path: path.to_string(),
                segment: segment.clone(),
            });
        }
        if path.depth() > max_depth {
            return Err(GenerationError::IncludeTooDeep {
                path: path.to_string(),
                depth: path.depth(),
                max: max_depth,
            });
        }
    }

    // Level by level, so aliases are numbered shallowest first and shared
    // prefixes ("Posts" of "Posts.Comments") are joined once.
    let mut joins: Vec<EagerJoin> = Vec::new();
    let mut by_prefix: HashMap<IncludePath, usize> = HashMap::new();
    let deepest = includes.iter().map(IncludePath::depth).max().unwrap_or(0);
    for level in 1..=deepest {
        for path in includes.iter().filter(|p| p.depth() >= level) {
            let prefix = path.prefix(level);
            if by_prefix.contains_key(&prefix) {
                continue;
            }
            let (parent_alias, parent_entity) = if level == 1 {
                (root.alias.clone(), root.entity)
            } else {
                let parent = by_prefix
                    .get(&path.prefix(level - 1))
                    .map(|index| &joins[*index].group)
                    .ok_or_else(|| GenerationError::InvalidIncludePath {
                        path: path.to_string(),
                        segment: path.segments()[level - 2].clone(),
                    })?;
                (parent.alias.clone(), parent.entity)
            };

            let alias = format!("j{}", joins.len());
            let join = plan_join(model, path, prefix.clone(), parent_alias, parent_entity, alias)?;
            log::debug!(
                "Eager join {} for `{}` ({} → {})",
                join.group.alias,
                join.path,
                model.entity(parent_entity).name,
                model.entity(join.group.entity).name
            );
            by_prefix.insert(prefix, joins.len());
            joins.push(join);
        }
    }

    let aliased = !joins.is_empty()
        || root.tables.len() > 1
        || root.shape == HierarchyShape::Union;
    Ok(ReadPlan {
        root,
        joins,
        aliased,
    })
}

/// Root aliases must be plain identifiers outside the `j<n>` space of
/// eager-load joins
fn validate_root_alias(alias: &str) -> Result<(), GenerationError> {
    let reason = if !IDENTIFIER_PATTERN.is_match(alias) {
        "not a plain identifier"
    } else if EAGER_ALIAS_PATTERN.is_match(alias) {
        "reserved for eager-load joins"
    } else {
        return Ok(());
    };
    Err(GenerationError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    })
}

fn plan_join(
    model: &EntityModel,
    full_path: &IncludePath,
    prefix: IncludePath,
    parent_alias: String,
    parent_entity: EntityId,
    alias: String,
) -> Result<EagerJoin, GenerationError> {
    let segment = prefix.segments()[prefix.depth() - 1].clone();
    let (_, navigation) = model
        .navigation(parent_entity, &segment)
        .map_err(|_| GenerationError::InvalidIncludePath {
            path: full_path.to_string(),
            segment: segment.clone(),
        })?;

    let target = model.entity(navigation.target);
    if target.strategy == InheritanceStrategy::PerConcreteTable
        && model.concrete_types(target.id) != [target.id]
    {
        return Err(GenerationError::UnsupportedInclude {
            path: full_path.to_string(),
            reason: format!(
                "`{}` spans several per-concrete-table tables",
                target.name
            ),
        });
    }

    let inverse = match &navigation.inverse {
        Some(name) => {
            let (_, back) = model.navigation(target.id, name)?;
            Some(InverseLink {
                name: back.name.clone(),
                cardinality: back.cardinality,
                foreign_key: back.foreign_key.clone(),
            })
        }
        None => None,
    };

    Ok(EagerJoin {
        path: prefix,
        parent_alias,
        parent_entity,
        navigation: navigation.name.clone(),
        cardinality: navigation.cardinality,
        foreign_key: navigation.foreign_key.clone(),
        inverse,
        group: plan_group(model, target.id, &alias)?,
    })
}

/// Tables and columns needed to materialize `entity` and any subtype of it
pub(crate) fn plan_group(
    model: &EntityModel,
    entity: EntityId,
    alias: &str,
) -> Result<AliasGroup, GenerationError> {
    let descriptor = model.entity(entity);
    let concrete = model.concrete_types(entity);
    if concrete.is_empty() {
        return Err(GenerationError::NoConcreteTypes {
            entity: descriptor.name.clone(),
        });
    }

    let aliases = TableAliases::new(model, entity, alias);
    let mut group = AliasGroup {
        entity,
        alias: alias.to_string(),
        shape: HierarchyShape::Plain,
        tables: vec![HierarchyTable {
            entity,
            table_name: descriptor.table_name.clone(),
            alias: alias.to_string(),
        }],
        columns: Vec::new(),
    };

    match descriptor.strategy {
        InheritanceStrategy::None => {
            push_fields(model, &mut group, &aliases, &model.lineage(entity));
        }
        InheritanceStrategy::SingleTable => {
            group.shape = HierarchyShape::Discriminated;
            let mut owners = model.lineage(entity);
            owners.extend(model.descendants(entity));
            push_fields(model, &mut group, &aliases, &owners);

            group.columns.push(SelectedColumn {
                table_alias: alias.to_string(),
                column: descriptor.discriminator().to_string(),
                value_type: ValueType::Text,
                role: ColumnRole::Discriminator,
            });
        }
        InheritanceStrategy::JoinedTable => {
            group.shape = HierarchyShape::Joined;
            let mut owners = vec![entity];
            owners.extend(model.ancestors(entity).into_iter().rev());
            owners.extend(model.descendants(entity));

            group.tables = owners
                .iter()
                .map(|owner| HierarchyTable {
                    entity: *owner,
                    table_name: model.entity(*owner).table_name.clone(),
                    alias: aliases.alias_for(*owner),
                })
                .collect();

            let mut ordered = model.lineage(entity);
            ordered.extend(model.descendants(entity));
            push_fields(model, &mut group, &aliases, &ordered);

            let key = &descriptor.key;
            for owner in ordered.into_iter().filter(|o| !model.entity(*o).is_root()) {
                group.columns.push(SelectedColumn {
                    table_alias: aliases.alias_for(owner),
                    column: key.column.clone(),
                    value_type: key.value_type,
                    role: ColumnRole::TableKey(owner),
                });
            }
        }
        InheritanceStrategy::PerConcreteTable => {
            if concrete == [entity] {
                push_fields(model, &mut group, &aliases, &model.lineage(entity));
            } else {
                group.shape = HierarchyShape::Union;
                group.tables = concrete
                    .iter()
                    .map(|c| HierarchyTable {
                        entity: *c,
                        table_name: model.entity(*c).table_name.clone(),
                        alias: alias.to_string(),
                    })
                    .collect();
                for c in &concrete {
                    push_fields(model, &mut group, &aliases, &model.lineage(*c));
                }
                group.columns.push(SelectedColumn {
                    table_alias: alias.to_string(),
                    column: TYPE_TAG_COLUMN.to_string(),
                    value_type: ValueType::Text,
                    role: ColumnRole::TypeTag,
                });
            }
        }
    }

    Ok(group)
}

/// Add the fields declared on each owner, skipping ones already present
fn push_fields(
    model: &EntityModel,
    group: &mut AliasGroup,
    aliases: &TableAliases<'_>,
    owners: &[EntityId],
) {
    for owner in owners {
        for field in &model.entity(*owner).scalar_fields {
            if group.field_column(*owner, &field.name).is_some() {
                continue;
            }
            group.columns.push(SelectedColumn {
                table_alias: aliases.alias_for(*owner),
                column: field.column.clone(),
                value_type: field.value_type,
                role: ColumnRole::Field {
                    owner: *owner,
                    name: field.name.clone(),
                },
            });
        }
    }
}
