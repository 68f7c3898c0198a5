use thiserror::Error;

use crate::config::ConfigError;
use crate::materializer::MaterializeError;
use crate::model::ModelError;
use crate::predicate::TranslateError;
use crate::sql_generator::GenerationError;
use crate::storage::StorageError;
use crate::tracking::TrackingError;

/// Every failure a unit of work can report
#[derive(Debug, Error)]
pub enum OrmError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
