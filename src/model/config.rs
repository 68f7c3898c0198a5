//! Entity definitions supplied by the mapping-construction layer.
//!
//! Definitions are plain data: they can be built in code with the fluent
//! helpers below or loaded from YAML:
//!
//! ```yaml
//! entities:
//!   - name: Animal
//!     table: Animals
//!     abstract: true
//!     strategy: single_table
//!     discriminator_column: Discriminator
//!     fields:
//!       - { name: Id, type: integer, key: true, auto_increment: true }
//!       - { name: Name, type: text }
//!   - name: Dog
//!     base: Animal
//!     fields:
//!       - { name: Breed, type: text }
//! ```
//!
//! Nothing here is validated beyond deserialization; `ModelBuilder` checks
//! the inheritance invariants.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::errors::ModelError;
use super::field::Cardinality;
use super::InheritanceStrategy;
use crate::value::ValueType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub entities: Vec<EntityDefinition>,
}

impl ModelConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|e| ModelError::ConfigRead {
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ModelError> {
        serde_yaml::from_str(yaml).map_err(|e| ModelError::ConfigParse {
            error: e.to_string(),
        })
    }

    /// Same document shape as the YAML form
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::ConfigParse {
            error: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    /// Defaults to the base's table under single-table inheritance and to
    /// the entity name otherwise
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub base: Option<String>,
    /// Derived types may omit the strategy and inherit the root's
    #[serde(default)]
    pub strategy: Option<InheritanceStrategy>,
    #[serde(default)]
    pub discriminator_column: Option<String>,
    #[serde(default)]
    pub discriminator_value: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            is_abstract: false,
            base: None,
            strategy: None,
            discriminator_column: None,
            discriminator_value: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn strategy(mut self, strategy: InheritanceStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn discriminator_column(mut self, column: impl Into<String>) -> Self {
        self.discriminator_column = Some(column.into());
        self
    }

    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = Some(value.into());
        self
    }

    /// Auto-increment key field whose column matches its name
    pub fn key(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let mut field = FieldDefinition::scalar(name, value_type);
        field.key = true;
        field.auto_increment = value_type == ValueType::Integer;
        self.fields.push(field);
        self
    }

    pub fn scalar(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.push(FieldDefinition::scalar(name, value_type));
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn reference(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDefinition::navigation(
            name,
            target,
            foreign_key,
            Cardinality::Single,
        ));
        self
    }

    pub fn collection(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDefinition::navigation(
            name,
            target,
            foreign_key,
            Cardinality::Collection,
        ));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Defaults to the field name for scalar fields; must be absent on navigations
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub navigation: Option<NavigationDefinition>,
}

impl FieldDefinition {
    pub fn scalar(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            column: None,
            value_type: Some(value_type),
            key: false,
            auto_increment: false,
            navigation: None,
        }
    }

    pub fn navigation(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            column: None,
            value_type: None,
            key: false,
            auto_increment: false,
            navigation: Some(NavigationDefinition {
                target: target.into(),
                foreign_key: foreign_key.into(),
                cardinality,
                inverse: None,
            }),
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn inverse(mut self, inverse: impl Into<String>) -> Self {
        if let Some(nav) = self.navigation.as_mut() {
            nav.inverse = Some(inverse.into());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationDefinition {
    pub target: String,
    pub foreign_key: String,
    #[serde(default = "default_cardinality")]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub inverse: Option<String>,
}

fn default_cardinality() -> Cardinality {
    Cardinality::Single
}
