//! # Predicate-to-SQL Translator
//!
//! Boolean expression trees over the fields of a single entity, and their
//! translation into parameterized SQL fragments.
//!
//! ```ignore
//! let predicate = Expr::field("Name")
//!     .starts_with("R")
//!     .and(Expr::field("Lives").gt(Expr::captured("min_lives", 3)));
//! ```

mod errors;
mod translator;

pub use errors::TranslateError;
pub use translator::{translate, PredicateTranslator, SqlFragment};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Expression tree over one entity parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Member access on the entity parameter
    Field(String),
    /// Constant written in the predicate
    Literal(Value),
    /// Value captured from the surrounding scope
    Captured { name: String, value: Value },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    MethodCall {
        method: String,
        target: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

pub const METHOD_CONTAINS: &str = "contains";
pub const METHOD_STARTS_WITH: &str = "starts_with";
pub const METHOD_ENDS_WITH: &str = "ends_with";

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn captured(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Captured {
            name: name.into(),
            value: value.into(),
        }
    }

    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ne, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Le, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ge, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn call(self, method: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::MethodCall {
            method: method.into(),
            target: Box::new(self),
            arguments,
        }
    }

    pub fn contains(self, value: impl Into<Expr>) -> Self {
        self.call(METHOD_CONTAINS, vec![value.into()])
    }

    pub fn starts_with(self, value: impl Into<Expr>) -> Self {
        self.call(METHOD_STARTS_WITH, vec![value.into()])
    }

    pub fn ends_with(self, value: impl Into<Expr>) -> Self {
        self.call(METHOD_ENDS_WITH, vec![value.into()])
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Literal(value.into())
                }
            }
        )*
    };
}

literal_from!(Value, i64, i32, f64, bool, &str, String);
