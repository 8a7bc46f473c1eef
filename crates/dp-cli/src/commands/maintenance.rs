//! Maintenance commands: drop or empty the pipeline's tables

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::create_orchestrator;

/// Drop every configured jobber table
pub async fn drop_intermediary(global: &GlobalArgs) -> Result<()> {
    let orchestrator = create_orchestrator(global)?;
    orchestrator
        .drop_intermediary_tables()
        .await
        .context("Failed to drop intermediary tables")?;
    println!("Dropped intermediary tables");
    Ok(())
}

/// Drop the output table
pub async fn drop_output(global: &GlobalArgs) -> Result<()> {
    let orchestrator = create_orchestrator(global)?;
    orchestrator
        .drop_output_table()
        .await
        .context("Failed to drop output table")?;
    println!("Dropped {}", orchestrator.config().output_table());
    Ok(())
}

/// Empty the output table, keeping it for the map server
pub async fn truncate_output(global: &GlobalArgs) -> Result<()> {
    let orchestrator = create_orchestrator(global)?;
    orchestrator
        .truncate_output_table()
        .await
        .context("Failed to truncate output table")?;
    println!("Truncated {}", orchestrator.config().output_table());
    Ok(())
}
