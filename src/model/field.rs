use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::value::ValueType;

/// A persisted member mapped to exactly one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub column: String,
    pub value_type: ValueType,
    pub is_key: bool,
    /// Key generated by the storage engine on INSERT
    pub auto_increment: bool,
}

/// Whether a navigation reaches one related instance or many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Collection,
}

/// A relationship member. Navigations never map to a column.
///
/// The foreign key lives on the declaring entity for `Single` navigations
/// (`Post.Blog` uses `Post.BlogId`) and on the target for `Collection`
/// navigations (`Blog.Posts` uses `Post.BlogId`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationField {
    pub name: String,
    pub target: EntityId,
    pub foreign_key: String,
    pub cardinality: Cardinality,
    /// Navigation on the target pointing back at the declaring entity,
    /// declared explicitly or inferred while building the model
    pub inverse: Option<String>,
}

impl NavigationField {
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }
}

/// Borrowed view over either partition of an entity's field list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDescriptor<'a> {
    Scalar(&'a ScalarField),
    Navigation(&'a NavigationField),
}

impl<'a> FieldDescriptor<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            FieldDescriptor::Scalar(f) => &f.name,
            FieldDescriptor::Navigation(n) => &n.name,
        }
    }

    /// Column name, `None` for navigation fields
    pub fn column(&self) -> Option<&'a str> {
        match self {
            FieldDescriptor::Scalar(f) => Some(&f.column),
            FieldDescriptor::Navigation(_) => None,
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, FieldDescriptor::Scalar(f) if f.is_key)
    }
}
