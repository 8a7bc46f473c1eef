//! Intersections command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, IntersectionsArgs};
use crate::commands::common::{create_database_connection, ensure_spatial_backend, load_config};
use dp_pipeline::IntersectionOrchestrator;

/// Execute the intersections command
pub async fn execute(args: &IntersectionsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    ensure_spatial_backend(&config.database)?;
    let db = create_database_connection(&config.database)?;
    let orchestrator = IntersectionOrchestrator::new(db, config.publish);

    let last_date = orchestrator
        .intersections(args.renew)
        .await
        .context("Intersection run failed")?;

    match last_date {
        Some(date) => println!("Published through {date}"),
        None => println!("No data published"),
    }
    Ok(())
}
