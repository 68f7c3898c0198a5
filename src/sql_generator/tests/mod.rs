use std::sync::Arc;

use super::{SqlGenerator, SqliteDialect};
use crate::model::EntityModel;

mod eager_join_tests;

fn generator(model: EntityModel) -> SqlGenerator {
    SqlGenerator::new(Arc::new(model), Arc::new(SqliteDialect))
}
