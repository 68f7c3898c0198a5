use thiserror::Error;

use crate::storage::StorageError;
use crate::tracking::TrackingError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MaterializeError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error("Result set has no column for `{column}` (expected `{expected}` or the bare column name)")]
    MissingColumn { column: String, expected: String },
    #[error("Row for `{entity}` has a NULL key")]
    NullKey { entity: String },
    #[error("Discriminator value `{value}` does not name a concrete subtype of `{entity}`")]
    UnknownDiscriminator { entity: String, value: String },
    #[error("Type tag `{tag}` does not name a concrete subtype of `{entity}`")]
    UnknownTypeTag { entity: String, tag: String },
    #[error("Row does not resolve to a concrete subtype of `{entity}`")]
    UnresolvedType { entity: String },
}
