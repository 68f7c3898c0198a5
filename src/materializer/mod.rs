//! # Join-Based Result Materializer
//!
//! Rebuilds tracked object graphs from the rows of a compiled SELECT.
//!
//! Per row the root group is read first, then every eager join in
//! shallowest-first order. Each instance goes through the identity map, so
//! fan-out rows repeating a parent resolve to the tracked instance. A
//! joined instance is attached to the instance its parent alias produced
//! in the same row, and the inverse navigation is wired back (relationship
//! fixup). Collection members are accumulated and assigned once all rows
//! have been read.

mod cursor;
pub mod errors;


use std::collections::{BTreeMap, HashMap, HashSet};

pub use cursor::{BufferedRows, ColumnOrdinals, RowCursor};
pub use errors::MaterializeError;

use crate::model::{Cardinality, EntityId, EntityModel};
use crate::sql_generator::{AliasGroup, ColumnRole, EagerJoin, HierarchyShape, ReadPlan};
use crate::tracking::{ChangeTracker, EntityObject, EntityState, ObjectId, TrackingError};
use crate::value::{KeyValue, ValueType};

/// A group with its columns bound to result ordinals
struct BoundGroup<'p> {
    group: &'p AliasGroup,
    /// Parallel to `group.columns`
    ordinals: Vec<usize>,
}

impl BoundGroup<'_> {
    fn ordinal_of(&self, role: &ColumnRole) -> Option<usize> {
        self.group
            .columns
            .iter()
            .position(|c| &c.role == role)
            .map(|index| self.ordinals[index])
    }
}

/// Collection members gathered during the scan, keyed by owner and navigation
type PendingCollections = BTreeMap<(ObjectId, String), Vec<ObjectId>>;

pub struct Materializer<'a> {
    model: &'a EntityModel,
    plan: &'a ReadPlan,
}

impl<'a> Materializer<'a> {
    pub fn new(model: &'a EntityModel, plan: &'a ReadPlan) -> Self {
        Self { model, plan }
    }

    /// Consume the cursor and return the distinct root instances in order of
    /// first appearance
    pub fn materialize(
        &self,
        cursor: &mut dyn RowCursor,
        tracker: &mut ChangeTracker,
    ) -> Result<Vec<ObjectId>, MaterializeError> {
        let ordinals = ColumnOrdinals::new(cursor.columns());
        let root = self.bind(&self.plan.root, &ordinals)?;
        let joins = self
            .plan
            .joins
            .iter()
            .map(|join| self.bind(&join.group, &ordinals))
            .collect::<Result<Vec<_>, _>>()?;

        let mut roots = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = PendingCollections::new();
        let mut row_count = 0usize;

        while cursor.advance()? {
            row_count += 1;
            let root_id = self.read_instance(&root, cursor, tracker)?.ok_or_else(|| {
                MaterializeError::NullKey {
                    entity: self.model.entity(root.group.entity).name.clone(),
                }
            })?;
            if seen.insert(root_id) {
                roots.push(root_id);
            }

            let mut in_row: HashMap<&str, ObjectId> = HashMap::new();
            in_row.insert(root.group.alias.as_str(), root_id);

            for (join, bound) in self.plan.joins.iter().zip(&joins) {
                // a deeper LEFT JOIN whose parent did not match
                let Some(&parent) = in_row.get(join.parent_alias.as_str()) else {
                    continue;
                };
                if join.cardinality == Cardinality::Collection {
                    pending
                        .entry((parent, join.navigation.clone()))
                        .or_default();
                }
                if self.is_unmatched(bound, cursor)? {
                    continue;
                }
                let Some(child) = self.read_instance(bound, cursor, tracker)? else {
                    continue;
                };
                in_row.insert(join.group.alias.as_str(), child);
                self.attach(join, parent, child, tracker, &mut pending)?;
            }
        }

        for ((owner, navigation), members) in pending {
            let object = tracker
                .get_mut(owner)
                .ok_or(TrackingError::UnknownObject(owner))?;
            object.ensure_collection(navigation.as_str());
            for member in members {
                object.add_to_collection(navigation.as_str(), member);
            }
        }

        log::debug!(
            "Materialized {} {} instance(s) from {} row(s)",
            roots.len(),
            self.model.entity(self.plan.root.entity).name,
            row_count
        );
        Ok(roots)
    }

    fn bind<'p>(
        &self,
        group: &'p AliasGroup,
        ordinals: &ColumnOrdinals,
    ) -> Result<BoundGroup<'p>, MaterializeError> {
        let ordinals = group
            .columns
            .iter()
            .map(|column| {
                ordinals
                    .resolve(column)
                    .ok_or_else(|| MaterializeError::MissingColumn {
                        column: format!("{}.{}", column.table_alias, column.column),
                        expected: self.plan.output_name(column),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BoundGroup { group, ordinals })
    }

    /// A LEFT JOIN found no match when every column of the target's own
    /// table is NULL
    fn is_unmatched(
        &self,
        bound: &BoundGroup<'_>,
        cursor: &dyn RowCursor,
    ) -> Result<bool, MaterializeError> {
        for (column, ordinal) in bound.group.columns.iter().zip(&bound.ordinals) {
            if column.table_alias == bound.group.alias && !cursor.is_null(*ordinal)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn runtime_type(
        &self,
        bound: &BoundGroup<'_>,
        cursor: &dyn RowCursor,
    ) -> Result<EntityId, MaterializeError> {
        let group = bound.group;
        let entity = &self.model.entity(group.entity).name;
        let resolved = match group.shape {
            HierarchyShape::Plain => Some(group.entity),
            HierarchyShape::Discriminated => {
                let ordinal = bound
                    .ordinal_of(&ColumnRole::Discriminator)
                    .ok_or_else(|| MaterializeError::UnresolvedType {
                        entity: entity.clone(),
                    })?;
                let value = cursor.get(ordinal, ValueType::Text)?;
                let value = value.as_text().unwrap_or_default().to_string();
                let root = self.model.root_of(group.entity);
                let found = self
                    .model
                    .type_for_discriminator(root, &value)
                    .filter(|t| self.model.is_same_or_descendant(*t, group.entity));
                if found.is_none() {
                    return Err(MaterializeError::UnknownDiscriminator {
                        entity: entity.clone(),
                        value,
                    });
                }
                found
            }
            HierarchyShape::Joined => {
                // the deepest table holding a part of this row
                let mut deepest: Option<(usize, EntityId)> = None;
                for (column, ordinal) in group.columns.iter().zip(&bound.ordinals) {
                    let ColumnRole::TableKey(owner) = column.role else {
                        continue;
                    };
                    if cursor.is_null(*ordinal)? {
                        continue;
                    }
                    let depth = self.model.lineage(owner).len();
                    if deepest.map_or(true, |(d, _)| depth > d) {
                        deepest = Some((depth, owner));
                    }
                }
                Some(deepest.map_or(group.entity, |(_, owner)| owner))
            }
            HierarchyShape::Union => {
                let ordinal = bound.ordinal_of(&ColumnRole::TypeTag).ok_or_else(|| {
                    MaterializeError::UnresolvedType {
                        entity: entity.clone(),
                    }
                })?;
                let tag = cursor.get(ordinal, ValueType::Text)?;
                let tag = tag.as_text().unwrap_or_default().to_string();
                let found = self
                    .model
                    .find(&tag)
                    .map(|d| d.id)
                    .filter(|t| self.model.is_same_or_descendant(*t, group.entity));
                if found.is_none() {
                    return Err(MaterializeError::UnknownTypeTag {
                        entity: entity.clone(),
                        tag,
                    });
                }
                found
            }
        };

        match resolved {
            Some(id) if !self.model.entity(id).is_abstract => Ok(id),
            _ => Err(MaterializeError::UnresolvedType {
                entity: entity.clone(),
            }),
        }
    }

    /// Identity-mapped instance for the current row, `None` when the key
    /// column is NULL
    fn read_instance(
        &self,
        bound: &BoundGroup<'_>,
        cursor: &dyn RowCursor,
        tracker: &mut ChangeTracker,
    ) -> Result<Option<ObjectId>, MaterializeError> {
        let runtime = self.runtime_type(bound, cursor)?;
        let root = self.model.root_of(runtime);
        let key_field = &self.model.entity(root).key;

        let field_ordinal = |owner: EntityId, name: &str| {
            bound
                .ordinal_of(&ColumnRole::Field {
                    owner,
                    name: name.to_string(),
                })
                .ok_or_else(|| MaterializeError::MissingColumn {
                    column: format!("{}.{}", self.model.entity(owner).name, name),
                    expected: name.to_string(),
                })
        };

        let key_value = cursor.get(field_ordinal(root, &key_field.name)?, key_field.value_type)?;
        let Some(key) = KeyValue::from_value(&key_value) else {
            return Ok(None);
        };
        if let Some(existing) = tracker.find(runtime, &key) {
            return Ok(Some(existing));
        }

        let mut object = EntityObject::new(runtime);
        for (owner, field) in self.model.scalar_fields(runtime) {
            let value = cursor.get(field_ordinal(owner, &field.name)?, field.value_type)?;
            object.set(field.name.clone(), value);
        }
        Ok(Some(tracker.track(object, EntityState::Unchanged)?))
    }

    /// Attach `child` under `parent` and wire the inverse side
    fn attach(
        &self,
        join: &EagerJoin,
        parent: ObjectId,
        child: ObjectId,
        tracker: &mut ChangeTracker,
        pending: &mut PendingCollections,
    ) -> Result<(), MaterializeError> {
        match join.cardinality {
            Cardinality::Single => {
                tracker
                    .get_mut(parent)
                    .ok_or(TrackingError::UnknownObject(parent))?
                    .set_reference(join.navigation.as_str(), Some(child));
            }
            Cardinality::Collection => {
                push_unique(pending, parent, &join.navigation, child);
            }
        }

        let Some(inverse) = &join.inverse else {
            return Ok(());
        };
        match inverse.cardinality {
            Cardinality::Single => {
                let parent_key = tracker.get(parent).and_then(|p| tracker.key_of(p));
                let object = tracker
                    .get_mut(child)
                    .ok_or(TrackingError::UnknownObject(child))?;
                object.set_reference(inverse.name.as_str(), Some(parent));
                // the child holds the foreign key of a one-to-many link
                if join.cardinality == Cardinality::Collection {
                    if let Some(key) = parent_key {
                        object.set(inverse.foreign_key.as_str(), key.to_value());
                    }
                }
            }
            Cardinality::Collection => {
                push_unique(pending, child, &inverse.name, parent);
            }
        }
        Ok(())
    }
}

fn push_unique(pending: &mut PendingCollections, owner: ObjectId, navigation: &str, member: ObjectId) {
    let members = pending.entry((owner, navigation.to_string())).or_default();
    if !members.contains(&member) {
        members.push(member);
    }
}
