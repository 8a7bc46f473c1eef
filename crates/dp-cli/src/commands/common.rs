//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use dp_core::{Config, DatabaseConfig, DbType};
use dp_db::{Database, DuckDbBackend, PostgresBackend};
use dp_pipeline::IntersectionOrchestrator;
use std::path::Path;
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Load and validate the configuration file named by `--config`
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    Config::load(Path::new(&global.config))
        .with_context(|| format!("Failed to load configuration from {}", global.config))
}

/// Create the database backend selected by the `database` section.
///
/// No connection is opened here; each orchestrator operation connects and
/// closes on its own.
pub(crate) fn create_database_connection(db_config: &DatabaseConfig) -> Result<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match db_config.db_type {
        DbType::Postgres => Arc::new(PostgresBackend::from_params(
            db_config.host.as_deref(),
            db_config.port,
            db_config.dbname.as_deref(),
            db_config.user.as_deref(),
            db_config.password.as_deref(),
        )),
        DbType::DuckDb => Arc::new(
            DuckDbBackend::new(&db_config.path).context("Failed to open DuckDB database")?,
        ),
    };
    log::debug!("Using {} backend", db.db_type());
    Ok(db)
}

/// Refuse backends that cannot run the intersection pipeline.
///
/// The pipeline relies on PostGIS functions and PostgreSQL DDL, so only the
/// maintenance and status commands work against DuckDB.
pub(crate) fn ensure_spatial_backend(db_config: &DatabaseConfig) -> Result<()> {
    if db_config.db_type != DbType::Postgres {
        anyhow::bail!(
            "dp intersections requires a PostgreSQL/PostGIS database, but database.type is {}; \
             the {} backend only supports drop-intermediary, drop-output, truncate-output and status",
            db_config.db_type,
            db_config.db_type
        );
    }
    Ok(())
}

/// Load the configuration and build an orchestrator over its backend
pub(crate) fn create_orchestrator(global: &GlobalArgs) -> Result<IntersectionOrchestrator> {
    let config = load_config(global)?;
    let db = create_database_connection(&config.database)?;
    Ok(IntersectionOrchestrator::new(db, config.publish))
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
