//! Configuration types and parsing for deter-publish.yml
//!
//! Loading is two-phase. The file first deserializes into all-optional raw
//! structs; validation then turns every absent key into
//! [`CoreError::MissingParameter`] and every malformed name into
//! [`CoreError::InvalidIdentifier`], before anything tries to connect.

use crate::error::{CoreError, CoreResult};
use crate::ident::{Ident, QualifiedName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "deter-publish.yml";

/// Jobber table key the pipeline stages filtered alerts in.
pub const WORK_TABLE_KEY: &str = "tb1";

const DEFAULT_DB_PATH: &str = ":memory:";

/// Main configuration: database connection plus publish layout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection configuration
    pub database: DatabaseConfig,

    /// Schema, table and sequence names the pipeline works on
    pub publish: PublishConfig,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// PostgreSQL with PostGIS (default)
    #[default]
    Postgres,
    /// Embedded DuckDB
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::Postgres => write!(f, "postgres"),
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
///
/// PostgreSQL fields left unset fall back to the standard `PG*` environment
/// variables of the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (postgres or duckdb)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Server host (postgres)
    #[serde(default)]
    pub host: Option<String>,

    /// Server port (postgres)
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name (postgres)
    #[serde(default)]
    pub dbname: Option<String>,

    /// Login role (postgres)
    #[serde(default)]
    pub user: Option<String>,

    /// Login password (postgres)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Database file path, or `:memory:` (duckdb)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            host: None,
            port: None,
            dbname: None,
            user: None,
            password: None,
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

/// Validated publish layout.
///
/// Built once per orchestrator and only read afterwards. Every name is an
/// [`Ident`], so statements built from it cannot carry arbitrary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    input_table: QualifiedName,
    output_table: QualifiedName,
    jobber_schema: Ident,
    jobber_tables: BTreeMap<String, QualifiedName>,
    sequence: QualifiedName,
    uc_table: QualifiedName,
    county_table: QualifiedName,
}

impl PublishConfig {
    /// Source alerts (`input_schema.input_table`)
    pub fn input_table(&self) -> &QualifiedName {
        &self.input_table
    }

    /// Publish target served to the map server (`output_schema.output_table`)
    pub fn output_table(&self) -> &QualifiedName {
        &self.output_table
    }

    /// Schema holding scratch tables, the sequence and the boundary layers
    pub fn jobber_schema(&self) -> &Ident {
        &self.jobber_schema
    }

    /// All scratch tables, ordered by configuration key
    pub fn jobber_tables(&self) -> impl Iterator<Item = &QualifiedName> {
        self.jobber_tables.values()
    }

    /// Scratch table the filtered alerts are staged in
    pub fn work_table(&self) -> &QualifiedName {
        // Presence of WORK_TABLE_KEY is checked in `from_raw`.
        &self.jobber_tables[WORK_TABLE_KEY]
    }

    /// Run-scoped identifier sequence
    pub fn sequence(&self) -> &QualifiedName {
        &self.sequence
    }

    /// Conservation-unit boundaries
    pub fn uc_table(&self) -> &QualifiedName {
        &self.uc_table
    }

    /// County boundaries
    pub fn county_table(&self) -> &QualifiedName {
        &self.county_table
    }

    fn from_raw(raw: RawPublishConfig) -> CoreResult<Self> {
        let input_schema = required_ident("input_schema", raw.input_schema)?;
        let input_table = required_ident("input_table", raw.input_table)?;
        let output_schema = required_ident("output_schema", raw.output_schema)?;
        let output_table = required_ident("output_table", raw.output_table)?;
        let jobber_schema = required_ident("jobber_schema", raw.jobber_schema)?;

        let raw_tables = raw.jobber_tables.ok_or_else(|| missing("jobber_tables"))?;
        if !raw_tables.contains_key(WORK_TABLE_KEY) {
            return Err(missing(&format!("jobber_tables.{WORK_TABLE_KEY}")));
        }
        let mut jobber_tables = BTreeMap::new();
        for (key, table) in raw_tables {
            let ident = Ident::parse(&format!("publish.jobber_tables.{key}"), &table)?;
            jobber_tables.insert(key, QualifiedName::new(jobber_schema.clone(), ident));
        }

        let sequence = required_ident("sequence", raw.sequence)?;
        let uc_table = required_ident("uc_table", raw.uc_table)?;
        let county_table = required_ident("county_table", raw.county_table)?;

        Ok(Self {
            input_table: QualifiedName::new(input_schema, input_table),
            output_table: QualifiedName::new(output_schema, output_table),
            jobber_tables,
            sequence: QualifiedName::new(jobber_schema.clone(), sequence),
            uc_table: QualifiedName::new(jobber_schema.clone(), uc_table),
            county_table: QualifiedName::new(jobber_schema.clone(), county_table),
            jobber_schema,
        })
    }
}

/// Publish section as written in the file; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPublishConfig {
    input_schema: Option<String>,
    input_table: Option<String>,
    output_schema: Option<String>,
    output_table: Option<String>,
    jobber_schema: Option<String>,
    jobber_tables: Option<BTreeMap<String, String>>,
    sequence: Option<String>,
    uc_table: Option<String>,
    county_table: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    publish: Option<RawPublishConfig>,
}

fn missing(key: &str) -> CoreError {
    CoreError::MissingParameter {
        key: format!("publish.{key}"),
    }
}

fn required_ident(key: &str, value: Option<String>) -> CoreResult<Ident> {
    let value = value.ok_or_else(|| missing(key))?;
    Ident::parse(&format!("publish.{key}"), &value)
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::parse(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> CoreResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        let publish = raw.publish.ok_or_else(|| CoreError::MissingParameter {
            key: "publish".to_string(),
        })?;
        let config = Self {
            database: raw.database,
            publish: PublishConfig::from_raw(publish)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    fn validate(&self) -> CoreResult<()> {
        let output = self.publish.output_table();
        if self.publish.jobber_tables().any(|t| t == output) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "output table {output} is also listed in jobber_tables and would be dropped every run"
                ),
            });
        }
        if self.publish.input_table() == output {
            return Err(CoreError::ConfigInvalid {
                message: format!("input and output table are both {output}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
