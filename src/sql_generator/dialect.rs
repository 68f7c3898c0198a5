//! Pluggable SQL dialects.
//!
//! The generator only talks to one dialect at a time; everything dialect
//! specific (parameter placeholders, pagination syntax, literal quoting) is
//! routed through this trait.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub trait Dialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Identifier quoting, double quotes for every supported dialect
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Placeholder for a named parameter. The same text is used as the key
    /// of the parameter map handed to the storage engine.
    fn parameter(&self, name: &str) -> String;

    /// Trailing pagination clause, if any
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String>;

    /// Engine-controlled string constant (never user input)
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Type and constraint text of a primary key column in CREATE TABLE
    fn key_column_type(&self, sql_type: &str, auto_increment: bool) -> String;
}

/// SQLite: `@name` parameters, `LIMIT n OFFSET m`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn parameter(&self, name: &str) -> String {
        format!("@{}", name)
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {}", limit)),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {} OFFSET {}", limit, offset)),
            // SQLite requires a LIMIT before OFFSET; -1 means unbounded
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {}", offset)),
        }
    }

    fn key_column_type(&self, sql_type: &str, _auto_increment: bool) -> String {
        // an INTEGER PRIMARY KEY aliases the rowid and is generated on insert
        format!("{} PRIMARY KEY", sql_type)
    }
}

/// SQL:2008 pagination with `:name` parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn parameter(&self, name: &str) -> String {
        format!(":{}", name)
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (None, Some(offset)) => Some(format!("OFFSET {} ROWS", offset)),
            (Some(limit), offset) => Some(format!(
                "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                offset.unwrap_or(0),
                limit
            )),
        }
    }

    fn key_column_type(&self, sql_type: &str, auto_increment: bool) -> String {
        if auto_increment {
            format!("{} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY", sql_type)
        } else {
            format!("{} PRIMARY KEY", sql_type)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Sqlite,
    Ansi,
}

impl DialectKind {
    pub fn create(&self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::Sqlite => Arc::new(SqliteDialect),
            DialectKind::Ansi => Arc::new(AnsiDialect),
        }
    }
}

impl std::str::FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DialectKind::Sqlite),
            "ansi" => Ok(DialectKind::Ansi),
            other => Err(format!("unknown dialect `{}`", other)),
        }
    }
}

/// Format a qualified column reference: "alias"."column"
pub fn qualified_column(dialect: &dyn Dialect, table_alias: &str, column: &str) -> String {
    format!(
        "{}.{}",
        dialect.quote_identifier(table_alias),
        dialect.quote_identifier(column)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some(10), None, Some("LIMIT 10"); "limit only")]
    #[test_case(Some(10), Some(20), Some("LIMIT 10 OFFSET 20"); "limit and offset")]
    #[test_case(None, Some(5), Some("LIMIT -1 OFFSET 5"); "offset only")]
    #[test_case(None, None, None; "no pagination")]
    fn test_sqlite_pagination(limit: Option<u64>, offset: Option<u64>, expected: Option<&str>) {
        assert_eq!(
            SqliteDialect.limit_offset(limit, offset).as_deref(),
            expected
        );
    }

    #[test]
    fn test_ansi_pagination_defaults_offset() {
        assert_eq!(
            AnsiDialect.limit_offset(Some(3), None).as_deref(),
            Some("OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY")
        );
    }

    #[test]
    fn test_identifier_quoting_escapes_quotes() {
        assert_eq!(SqliteDialect.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(qualified_column(&SqliteDialect, "t", "Id"), "\"t\".\"Id\"");
    }

    #[test]
    fn test_string_literal_escapes_single_quotes() {
        assert_eq!(SqliteDialect.string_literal("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_parameter_prefixes() {
        assert_eq!(SqliteDialect.parameter("p0"), "@p0");
        assert_eq!(AnsiDialect.parameter("p0"), ":p0");
        assert_eq!("ANSI".parse::<DialectKind>(), Ok(DialectKind::Ansi));
    }
}
