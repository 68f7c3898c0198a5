use thiserror::Error;

use super::{EntityState, ObjectId};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackingError {
    #[error("Object {0} is not tracked by this unit of work")]
    UnknownObject(ObjectId),
    #[error("Object {object} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        object: ObjectId,
        from: EntityState,
        to: EntityState,
    },
    #[error("Object {object} of type `{entity}` has no usable key value")]
    MissingKey { object: ObjectId, entity: String },
    #[error("Entity `{entity}` is abstract and cannot be instantiated")]
    AbstractEntity { entity: String },
}
