use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::model::IDENTIFIER_PATTERN;
use crate::sql_generator::{DialectKind, DEFAULT_MAX_INCLUDE_DEPTH, DEFAULT_ROOT_ALIAS};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQL dialect used for every generated statement
    pub dialect: DialectKind,

    /// Alias of the queried entity's table
    #[validate(custom(function = validate_alias))]
    pub root_alias: String,

    /// Log every generated statement at info level instead of debug
    pub log_statements: bool,

    /// Maximum number of segments in an eager-load path
    #[validate(range(
        min = 1,
        max = 16,
        message = "Max include depth must be between 1 and 16"
    ))]
    pub max_include_depth: usize,

    /// SQLite database file, or `:memory:`
    #[validate(length(min = 1, message = "Database path cannot be empty"))]
    pub database_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Sqlite,
            root_alias: DEFAULT_ROOT_ALIAS.to_string(),
            log_statements: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            database_path: ":memory:".to_string(),
        }
    }
}

fn validate_alias(alias: &str) -> Result<(), ValidationError> {
    if IDENTIFIER_PATTERN.is_match(alias) {
        Ok(())
    } else {
        Err(ValidationError::new("root_alias")
            .with_message("Root alias must be a plain identifier".into()))
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let dialect = env::var("RELMAP_DIALECT").unwrap_or_else(|_| "sqlite".to_string());
        let config = Self {
            dialect: dialect.parse().map_err(|e: String| ConfigError::Parse {
                field: "RELMAP_DIALECT".to_string(),
                value: dialect.clone(),
                source: e.into(),
            })?,
            root_alias: env::var("RELMAP_ROOT_ALIAS")
                .unwrap_or_else(|_| DEFAULT_ROOT_ALIAS.to_string()),
            log_statements: parse_env_var("RELMAP_LOG_STATEMENTS", "false")?,
            max_include_depth: parse_env_var(
                "RELMAP_MAX_INCLUDE_DEPTH",
                &DEFAULT_MAX_INCLUDE_DEPTH.to_string(),
            )?,
            database_path: env::var("RELMAP_DATABASE_PATH")
                .unwrap_or_else(|_| ":memory:".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
