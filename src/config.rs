use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::catalog::{ConfiguredSchemas, MetadataProvider};
use crate::compiler::SqlCompiler;
use crate::dialect::{self, DialectError, DialectKind};
use crate::query::{DbQuery, QueryError, QuerySpec};

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

    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),
}

/// Compiler configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// SQL dialect; the process-wide dialect is used when unset
    pub dialect: Option<DialectKind>,

    /// Schema qualifying tables whose schema id has no entry in `schemas`
    pub default_schema: Option<String>,

    /// Physical schema name per logical schema id
    #[validate(custom(function = "validate_schemas"))]
    pub schemas: HashMap<String, String>,

    /// Identifier length limit of the target database (aliases are bounded to 30)
    #[validate(range(
        min = 18,
        max = 128,
        message = "Max identifier length must be between 18 and 128"
    ))]
    pub max_identifier_len: u32,

    /// Whether text comparisons ignore case
    pub case_insensitive_search: bool,

    /// Whether an ambiguous automatic join is an error instead of a warning
    pub strict_join_resolution: bool,

    /// Whether unreferenced LEFT-joined tables are left out of FROM
    pub prune_outer_joins: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            default_schema: None,
            schemas: HashMap::new(),
            max_identifier_len: 30,
            case_insensitive_search: true,
            strict_join_resolution: false,
            prune_outer_joins: false,
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables (and `.env`) with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let dialect = match env::var("DBQUERY_DIALECT") {
            Ok(name) if !name.trim().is_empty() => {
                let kind = name.parse::<DialectKind>().map_err(|e| ConfigError::Parse {
                    field: "DBQUERY_DIALECT".to_string(),
                    value: name.clone(),
                    source: Box::new(e),
                })?;
                Some(kind)
            }
            _ => None,
        };

        let config = Self {
            dialect,
            default_schema: env::var("DBQUERY_DEFAULT_SCHEMA").ok().filter(|s| !s.is_empty()),
            schemas: parse_schema_list(&env::var("DBQUERY_SCHEMAS").unwrap_or_default())?,
            max_identifier_len: parse_env_var("DBQUERY_MAX_IDENTIFIER_LEN", "30")?,
            case_insensitive_search: parse_env_var("DBQUERY_CASE_INSENSITIVE", "true")?,
            strict_join_resolution: parse_env_var("DBQUERY_STRICT_JOINS", "false")?,
            prune_outer_joins: parse_env_var("DBQUERY_PRUNE_OUTER_JOINS", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            dialect: cli.dialect,
            default_schema: cli.default_schema,
            schemas: cli.schemas,
            max_identifier_len: 30,
            case_insensitive_search: !cli.case_sensitive,
            strict_join_resolution: cli.strict_joins,
            prune_outer_joins: cli.prune_outer_joins,
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

    /// Merge with another configuration (CLI overrides environment).
    /// Unset options of `other` keep the current value.
    pub fn merge(&mut self, other: Self) {
        if other.dialect.is_some() {
            self.dialect = other.dialect;
        }
        if other.default_schema.is_some() {
            self.default_schema = other.default_schema;
        }
        self.schemas.extend(other.schemas);
        self.max_identifier_len = other.max_identifier_len;
        self.case_insensitive_search = other.case_insensitive_search;
        self.strict_join_resolution = other.strict_join_resolution;
        self.prune_outer_joins = other.prune_outer_joins;
    }

    pub fn schema_resolver(&self) -> ConfiguredSchemas {
        self.schemas.iter().fold(
            ConfiguredSchemas::new(self.default_schema.clone()),
            |schemas, (id, name)| schemas.with_schema(id.clone(), name.clone()),
        )
    }

    /// Compiler for the configured dialect, falling back to the process dialect.
    pub fn build_compiler(&self) -> Result<SqlCompiler, ConfigError> {
        let kind = match self.dialect {
            Some(kind) => kind,
            None => dialect::process_dialect()?,
        };
        Ok(SqlCompiler::new(kind)
            .with_schemas(Arc::new(self.schema_resolver()))
            .with_outer_join_pruning(self.prune_outer_joins))
    }

    /// Apply the query-level options to a query. Joins already added keep the
    /// link they were resolved with; use [`CompilerConfig::build_query`] to
    /// resolve every join under this configuration.
    pub fn apply_to(&self, query: &mut DbQuery) {
        query
            .set_case_insensitive(self.case_insensitive_search)
            .set_strict_joins(self.strict_join_resolution);
    }

    /// Build a query definition with the query-level options in effect.
    pub fn build_query(
        &self,
        spec: &QuerySpec,
        provider: Arc<dyn MetadataProvider>,
    ) -> Result<DbQuery, QueryError> {
        spec.build_configured(provider, |query| self.apply_to(query))
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub dialect: Option<DialectKind>,
    pub default_schema: Option<String>,
    pub schemas: HashMap<String, String>,
    pub case_sensitive: bool,
    pub strict_joins: bool,
    pub prune_outer_joins: bool,
}

fn validate_schemas(schemas: &HashMap<String, String>) -> Result<(), ValidationError> {
    if schemas.iter().any(|(id, name)| id.trim().is_empty() || name.trim().is_empty()) {
        let mut error = ValidationError::new("empty_schema");
        error.message = Some("Schema ids and names cannot be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Parse `id=NAME,id2=NAME2` schema mappings
pub fn parse_schema_list(value: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut schemas = HashMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, name) = entry.split_once('=').ok_or_else(|| ConfigError::Parse {
            field: "schemas".to_string(),
            value: entry.to_string(),
            source: "expected <id>=<schema>".into(),
        })?;
        schemas.insert(id.trim().to_string(), name.trim().to_string());
    }
    Ok(schemas)
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
