use thiserror::Error;

use crate::model::ModelError;
use crate::predicate::TranslateError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("Eager-load path `{path}`: `{segment}` is not a navigation")]
    InvalidIncludePath { path: String, segment: String },
    #[error("Table alias `{alias}` is not usable: {reason}")]
    InvalidAlias { alias: String, reason: String },
    #[error("Eager-load path `{path}` is {depth} levels deep (maximum {max})")]
    IncludeTooDeep {
        path: String,
        depth: usize,
        max: usize,
    },
    #[error("Eager-load path `{path}` is not supported: {reason}")]
    UnsupportedInclude { path: String, reason: String },
    #[error("Entity `{entity}` has no concrete types to read")]
    NoConcreteTypes { entity: String },
    #[error("Entity `{entity}` is abstract and cannot be written")]
    AbstractEntity { entity: String },
    #[error("Entity `{entity}` has no value for key field `{field}`")]
    MissingKeyValue { entity: String, field: String },
}
