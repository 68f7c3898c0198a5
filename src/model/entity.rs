use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::{NavigationField, ScalarField};

/// Discriminator column used when a single-table root names none
pub const DEFAULT_DISCRIMINATOR_COLUMN: &str = "Discriminator";

/// Index of a descriptor inside its `EntityModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a type hierarchy is laid out across tables.
///
/// Every descriptor of one hierarchy carries the same strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceStrategy {
    /// Standalone type, no inheritance
    #[default]
    None,
    /// One shared table, rows told apart by a discriminator column
    SingleTable,
    /// One table per type, joined on the key column
    JoinedTable,
    /// One complete table per concrete type
    PerConcreteTable,
}

/// Immutable compiled description of one mapped type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub id: EntityId,
    pub name: String,
    pub table_name: String,
    pub is_abstract: bool,
    /// Resolved once at the hierarchy root and shared by every derived type
    pub key: ScalarField,
    /// Scalar fields declared on this type (the root's list includes the key)
    pub scalar_fields: Vec<ScalarField>,
    /// Navigation fields declared on this type
    pub navigation_fields: Vec<NavigationField>,
    pub strategy: InheritanceStrategy,
    pub base: Option<EntityId>,
    /// Shared discriminator column, single-table hierarchies only
    pub discriminator_column: Option<String>,
    /// Discriminator value of this type; `None` for abstract types
    pub discriminator_value: Option<String>,
}

impl EntityDescriptor {
    pub fn is_root(&self) -> bool {
        self.base.is_none()
    }

    pub fn declared_scalar(&self, name: &str) -> Option<&ScalarField> {
        self.scalar_fields.iter().find(|f| f.name == name)
    }

    pub fn declared_navigation(&self, name: &str) -> Option<&NavigationField> {
        self.navigation_fields.iter().find(|n| n.name == name)
    }

    /// Discriminator column shared by a single-table hierarchy
    pub fn discriminator(&self) -> &str {
        self.discriminator_column
            .as_deref()
            .unwrap_or(DEFAULT_DISCRIMINATOR_COLUMN)
    }

    /// Scalar fields declared here, without the inherited key
    pub fn own_non_key_fields(&self) -> impl Iterator<Item = &ScalarField> {
        self.scalar_fields.iter().filter(|f| !f.is_key)
    }
}
