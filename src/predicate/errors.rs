use thiserror::Error;

use crate::model::ModelError;

/// Unsupported predicate shapes. These describe the query, not the data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    #[error("Unsupported method `{0}` (allowed: contains, starts_with, ends_with)")]
    UnsupportedMethod(String),
    #[error("Method `{method}` expects {expected} argument(s) but got {found}")]
    InvalidArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("Method `{method}` must be called on a field with a text argument")]
    InvalidMethodOperands { method: String },
    #[error("Unsupported operand in {context} (allowed: field access, literal, captured value)")]
    UnsupportedOperand { context: String },
    #[error("Field `{field}` is not boolean and cannot be used as a condition")]
    NonBooleanCondition { field: String },
    #[error("Literal values cannot be used as a condition on their own")]
    LiteralCondition,
    #[error(transparent)]
    Model(#[from] ModelError),
}
