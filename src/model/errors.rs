//! # Model Error Types
//!
//! Configuration errors raised while building the entity model or while
//! resolving field names against it. All of them surface before any
//! statement reaches the storage engine.

use thiserror::Error;

use super::InheritanceStrategy;
use crate::value::ValueType;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("No entity named `{entity}` is registered in the model")]
    UnknownEntity { entity: String },
    #[error("Entity `{entity}` is defined more than once")]
    DuplicateEntity { entity: String },
    #[error("Entity `{entity}` derives from unknown base `{base}`")]
    UnknownBase { entity: String, base: String },
    #[error("Inheritance cycle detected through entity `{entity}`")]
    InheritanceCycle { entity: String },
    #[error("Entity `{entity}` has no primary key field")]
    MissingPrimaryKey { entity: String },
    #[error("Entity `{entity}` declares more than one primary key field")]
    MultipleKeys { entity: String },
    #[error("Derived entity `{entity}` redeclares the primary key; keys are inherited from the root")]
    KeyRedeclared { entity: String },
    #[error("Key field `{entity}.{field}` has type {value_type}, which cannot identify an entity")]
    InvalidKeyType {
        entity: String,
        field: String,
        value_type: ValueType,
    },
    #[error("Entity `{entity}` uses strategy {found:?} but its hierarchy uses {expected:?}")]
    StrategyMismatch {
        entity: String,
        expected: InheritanceStrategy,
        found: InheritanceStrategy,
    },
    #[error("Entity `{entity}` has derived types but no inheritance strategy")]
    MissingStrategy { entity: String },
    #[error("Joined-table entity `{entity}` must not share table `{table}` with ancestor `{ancestor}`")]
    SharedJoinedTable {
        entity: String,
        ancestor: String,
        table: String,
    },
    #[error("Single-table entity `{entity}` maps to `{table}` but its base maps to `{base_table}`")]
    SingleTableMismatch {
        entity: String,
        table: String,
        base_table: String,
    },
    #[error("Entity `{entity}` declares a discriminator, which per-concrete-table inheritance does not allow")]
    DiscriminatorNotAllowed { entity: String },
    #[error("Discriminator value `{value}` is used by both `{first}` and `{second}`")]
    DuplicateDiscriminator {
        value: String,
        first: String,
        second: String,
    },
    #[error("Field `{field}` is declared more than once in the hierarchy of `{entity}`")]
    DuplicateField { entity: String, field: String },
    #[error("Invalid {kind} identifier `{value}`")]
    InvalidIdentifier { kind: String, value: String },
    #[error("Field `{entity}.{field}` is a navigation and cannot declare a column")]
    ColumnOnNavigation { entity: String, field: String },
    #[error("Scalar field `{entity}.{field}` has no value type")]
    MissingValueType { entity: String, field: String },
    #[error("Navigation `{entity}.{navigation}` targets unknown entity `{target}`")]
    UnknownNavigationTarget {
        entity: String,
        navigation: String,
        target: String,
    },
    #[error("Navigation `{entity}.{navigation}` uses foreign key `{field}`, which is not a scalar field of `{owner}`")]
    UnknownForeignKey {
        entity: String,
        navigation: String,
        field: String,
        owner: String,
    },
    #[error("Navigation `{entity}.{navigation}` declares inverse `{inverse}`, which is not a navigation of `{target}`")]
    UnknownInverse {
        entity: String,
        navigation: String,
        inverse: String,
        target: String,
    },
    #[error("Field `{entity}.{field}` has no column mapping and cannot be used in a column position")]
    NoColumn { entity: String, field: String },
    #[error("Entity `{entity}` has no field named `{field}`")]
    UnknownField { entity: String, field: String },
    #[error("Entity `{entity}` has no navigation named `{navigation}`")]
    UnknownNavigation { entity: String, navigation: String },
    #[error("Failed to read model definition: {error}")]
    ConfigRead { error: String },
    #[error("Failed to parse model definition: {error}")]
    ConfigParse { error: String },
}

impl ModelError {
    /// Create an UnknownField error with context about where the lookup happened
    pub fn unknown_field_with_context(
        entity: impl Into<String>,
        field: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let ctx = context.into();
        ModelError::UnknownField {
            entity: entity.into(),
            field: format!("{}\n  Context: {}", field, ctx),
        }
    }
}
