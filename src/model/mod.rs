//! # Entity & Inheritance Metadata Model
//!
//! Immutable descriptors of mapped types. `ModelBuilder` validates entity
//! definitions and produces an `EntityModel`, an arena of
//! `EntityDescriptor`s indexed by `EntityId`. Descriptors form a forest
//! through their `base` links; a base → direct-children index makes
//! descendant walks independent of model size.
//!
//! The model is never mutated after `build()` and is shared read-only
//! (`Arc<EntityModel>`) between units of work.

mod builder;
pub mod config;
mod entity;
pub mod errors;
mod field;


use std::collections::HashMap;

pub use builder::ModelBuilder;
pub(crate) use builder::IDENTIFIER_PATTERN;
pub use config::{EntityDefinition, FieldDefinition, ModelConfig, NavigationDefinition};
pub use entity::{EntityDescriptor, EntityId, InheritanceStrategy, DEFAULT_DISCRIMINATOR_COLUMN};
pub use errors::ModelError;
pub use field::{Cardinality, FieldDescriptor, NavigationField, ScalarField};

#[derive(Debug, Clone)]
pub struct EntityModel {
    entities: Vec<EntityDescriptor>,
    by_name: HashMap<String, EntityId>,
    children: Vec<Vec<EntityId>>,
    discriminators: HashMap<(EntityId, String), EntityId>,
}

impl EntityModel {
    fn new(
        entities: Vec<EntityDescriptor>,
        by_name: HashMap<String, EntityId>,
        discriminators: HashMap<(EntityId, String), EntityId>,
    ) -> Self {
        let mut children = vec![Vec::new(); entities.len()];
        for entity in &entities {
            if let Some(base) = entity.base {
                children[base.0].push(entity.id);
            }
        }
        Self {
            entities,
            by_name,
            children,
            discriminators,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    /// Descriptor for an id minted by this model
    pub fn entity(&self, id: EntityId) -> &EntityDescriptor {
        &self.entities[id.0]
    }

    pub fn find(&self, name: &str) -> Option<&EntityDescriptor> {
        self.by_name.get(name).map(|id| self.entity(*id))
    }

    pub fn require(&self, name: &str) -> Result<&EntityDescriptor, ModelError> {
        self.find(name).ok_or_else(|| ModelError::UnknownEntity {
            entity: name.to_string(),
        })
    }

    pub fn root_of(&self, id: EntityId) -> EntityId {
        let mut current = id;
        while let Some(base) = self.entity(current).base {
            current = base;
        }
        current
    }

    /// Ancestors nearest first, excluding `id`
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut ancestors = Vec::new();
        let mut current = self.entity(id).base;
        while let Some(base) = current {
            ancestors.push(base);
            current = self.entity(base).base;
        }
        ancestors
    }

    /// Root first, ending with `id`
    pub fn lineage(&self, id: EntityId) -> Vec<EntityId> {
        let mut lineage = self.ancestors(id);
        lineage.reverse();
        lineage.push(id);
        lineage
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        &self.children[id.0]
    }

    /// All descendants in pre-order, excluding `id`
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut descendants = Vec::new();
        let mut stack: Vec<EntityId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            descendants.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        descendants
    }

    pub fn is_same_or_descendant(&self, id: EntityId, ancestor: EntityId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// `id` itself when concrete, followed by every concrete descendant
    pub fn concrete_types(&self, id: EntityId) -> Vec<EntityId> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter(|e| !self.entity(*e).is_abstract)
            .collect()
    }

    /// Every scalar field visible on `id` paired with the type declaring it,
    /// root-declared fields first
    pub fn scalar_fields(&self, id: EntityId) -> Vec<(EntityId, &ScalarField)> {
        self.lineage(id)
            .into_iter()
            .flat_map(|owner| {
                self.entity(owner)
                    .scalar_fields
                    .iter()
                    .map(move |field| (owner, field))
            })
            .collect()
    }

    pub fn navigation_fields(&self, id: EntityId) -> Vec<(EntityId, &NavigationField)> {
        self.lineage(id)
            .into_iter()
            .flat_map(|owner| {
                self.entity(owner)
                    .navigation_fields
                    .iter()
                    .map(move |nav| (owner, nav))
            })
            .collect()
    }

    /// Field visible on `id` (declared on it or inherited) with its owner
    pub fn field(&self, id: EntityId, name: &str) -> Option<(EntityId, FieldDescriptor<'_>)> {
        for owner in self.lineage(id) {
            let descriptor = self.entity(owner);
            if let Some(field) = descriptor.declared_scalar(name) {
                return Some((owner, FieldDescriptor::Scalar(field)));
            }
            if let Some(nav) = descriptor.declared_navigation(name) {
                return Some((owner, FieldDescriptor::Navigation(nav)));
            }
        }
        None
    }

    /// Resolve a field that must map to a column.
    ///
    /// Navigation fields are rejected with `NoColumn`, unknown names with
    /// `UnknownField`.
    pub fn column_field(
        &self,
        id: EntityId,
        name: &str,
    ) -> Result<(EntityId, &ScalarField), ModelError> {
        match self.field(id, name) {
            Some((owner, FieldDescriptor::Scalar(field))) => Ok((owner, field)),
            Some((_, FieldDescriptor::Navigation(_))) => Err(ModelError::NoColumn {
                entity: self.entity(id).name.clone(),
                field: name.to_string(),
            }),
            None => Err(ModelError::UnknownField {
                entity: self.entity(id).name.clone(),
                field: name.to_string(),
            }),
        }
    }

    pub fn navigation(
        &self,
        id: EntityId,
        name: &str,
    ) -> Result<(EntityId, &NavigationField), ModelError> {
        match self.field(id, name) {
            Some((owner, FieldDescriptor::Navigation(nav))) => Ok((owner, nav)),
            _ => Err(ModelError::UnknownNavigation {
                entity: self.entity(id).name.clone(),
                navigation: name.to_string(),
            }),
        }
    }

    /// Concrete type stored under a discriminator value within a hierarchy
    pub fn type_for_discriminator(&self, root: EntityId, value: &str) -> Option<EntityId> {
        self.discriminators.get(&(root, value.to_string())).copied()
    }

    /// Scope in which primary keys are unique.
    ///
    /// Per-concrete-table types own independent key spaces, every other
    /// hierarchy shares the root's.
    pub fn identity_scope(&self, id: EntityId) -> EntityId {
        match self.entity(id).strategy {
            InheritanceStrategy::PerConcreteTable => id,
            _ => self.root_of(id),
        }
    }
}
