//! Query specifications handed to the SQL generator.
//!
//! A `QuerySpec` is assembled fresh per request and never mutated after it
//! is submitted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::predicate::Expr;

/// Dotted chain of navigation names, e.g. `Posts.Comments`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludePath(Vec<String>);

impl IncludePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split a dotted path. Empty segments are kept so that the generator
    /// can reject them with the offending path.
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(|s| s.trim().to_string()).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path made of the first `len` segments
    pub fn prefix(&self, len: usize) -> IncludePath {
        IncludePath(self.0[..len.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for IncludePath {
    fn from(path: &str) -> Self {
        IncludePath::parse(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub entity: String,
    /// Root table alias; the engine default is used when absent
    pub alias: Option<String>,
    pub predicate: Option<Expr>,
    pub includes: Vec<IncludePath>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QuerySpec {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: None,
            predicate: None,
            includes: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the filter. A second call AND-s the predicates together.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn include(mut self, path: impl Into<IncludePath>) -> Self {
        self.includes.push(path.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
