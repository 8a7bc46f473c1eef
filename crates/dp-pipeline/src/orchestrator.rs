//! Public operations and the transaction envelope around them.
//!
//! Every operation owns one connection for its whole lifetime: it connects,
//! runs all of its statements in a single transaction, commits once (or
//! rolls back on any failure) and always closes the connection.

use crate::error::{PublishError, PublishResult};
use crate::intersect::{IntersectionPipeline, JoinOutcome};
use crate::jobber::IntermediaryTables;
use crate::session::Session;
use crate::statements::Statements;
use crate::tracker::StateTracker;
use chrono::NaiveDate;
use dp_core::{publish_month, Config, PublishConfig};
use dp_db::Database;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Snapshot of the output table, read without changing anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputStatus {
    /// Qualified output table name
    pub output_table: String,
    /// Whether the output table exists
    pub exists: bool,
    /// Most recent creation date published
    pub last_date: Option<NaiveDate>,
    /// Highest identifier published
    pub last_identifier: Option<i64>,
    /// Publish month of the most recent creation date
    pub latest_publish_month: Option<NaiveDate>,
}

/// How a successful operation ends its transaction
#[derive(Debug, Clone, Copy)]
enum Completion {
    Commit,
    Discard,
}

/// Runs the publish pipeline and the maintenance operations
pub struct IntersectionOrchestrator {
    db: Arc<dyn Database>,
    config: PublishConfig,
}

impl IntersectionOrchestrator {
    /// Create an orchestrator over a validated publish layout
    pub fn new(db: Arc<dyn Database>, config: PublishConfig) -> Self {
        Self { db, config }
    }

    /// Load the publish layout from a YAML file.
    ///
    /// Missing keys fail here, before any connection is attempted.
    pub fn load(db: Arc<dyn Database>, path: &Path) -> PublishResult<Self> {
        let config = Config::load(path)?;
        Ok(Self::new(db, config.publish))
    }

    /// The publish layout in use
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// With `renew`, the output table is emptied first (never dropped) and
    /// every alert is reprocessed. Returns the most recent creation date in
    /// the output table after the run, or `None` if it holds no rows.
    pub async fn intersections(&self, renew: bool) -> PublishResult<Option<NaiveDate>> {
        log::info!(
            "Publishing {} into {} (renew: {renew})",
            self.config.input_table(),
            self.config.output_table()
        );
        self.open().await?;
        let result = self.run_intersections(renew).await;
        self.finish("intersections", result, Completion::Commit).await
    }

    /// Drop every configured jobber table
    pub async fn drop_intermediary_tables(&self) -> PublishResult<()> {
        self.open().await?;
        let result = self.jobber().drop_all().await;
        self.finish("drop intermediary tables", result, Completion::Commit)
            .await
    }

    /// Drop the output table if it exists
    pub async fn drop_output_table(&self) -> PublishResult<()> {
        self.open().await?;
        let result = self
            .session()
            .execute("drop output table", &self.statements().drop_output())
            .await;
        self.finish("drop output table", result, Completion::Commit)
            .await
    }

    /// Empty the output table and restart its identity, keeping the table
    pub async fn truncate_output_table(&self) -> PublishResult<()> {
        self.open().await?;
        let result = self
            .session()
            .execute("truncate output table", &self.statements().truncate_output())
            .await;
        self.finish("truncate output table", result, Completion::Commit)
            .await
    }

    /// Read the state of the output table; the transaction is rolled back
    pub async fn status(&self) -> PublishResult<OutputStatus> {
        self.open().await?;
        let result = self.read_status().await;
        self.finish("status", result, Completion::Discard).await
    }

    fn session(&self) -> Session<'_> {
        Session::new(self.db.as_ref())
    }

    fn statements(&self) -> Statements<'_> {
        Statements::new(&self.config)
    }

    fn jobber(&self) -> IntermediaryTables<'_> {
        IntermediaryTables::new(self.session(), self.statements())
    }

    fn tracker(&self) -> StateTracker<'_> {
        StateTracker::new(self.session(), self.statements())
    }

    async fn run_intersections(&self, renew: bool) -> PublishResult<Option<NaiveDate>> {
        let jobber = self.jobber();
        let tracker = self.tracker();
        let pipeline = IntersectionPipeline::new(self.session(), self.statements());

        if renew {
            if tracker.output_table_exists().await? {
                log::info!("Renewing: truncating {}", self.config.output_table());
                self.session()
                    .execute("truncate output table", &self.statements().truncate_output())
                    .await?;
            } else {
                log::info!("Renewing: output table absent, nothing to truncate");
            }
        }

        jobber.drop_all().await?;
        let baseline = tracker.get_last_date().await?;
        match baseline {
            Some(date) => log::info!("Incremental run from {date}"),
            None => log::info!("No baseline date, full build"),
        }

        jobber.create_sequence().await?;
        pipeline.populate_work_table(baseline).await?;
        match pipeline.intersect_counties().await? {
            JoinOutcome::Created => log::info!("Created {}", self.config.output_table()),
            JoinOutcome::Appended { first_gid } => log::info!(
                "Appended to {} from gid {first_gid}",
                self.config.output_table()
            ),
        }
        pipeline.intersect_conservation_units().await?;
        jobber.drop_sequence().await?;
        jobber.drop_all().await?;

        let last_date = tracker.get_last_date().await?;
        match last_date {
            Some(date) => log::info!("Latest published creation date: {date}"),
            None => log::info!("Output table holds no dated rows"),
        }
        Ok(last_date)
    }

    async fn read_status(&self) -> PublishResult<OutputStatus> {
        let tracker = self.tracker();
        let exists = tracker.output_table_exists().await?;
        let (last_date, last_identifier) = if exists {
            (
                tracker.get_last_date().await?,
                tracker.last_identifier().await?.found(),
            )
        } else {
            (None, None)
        };
        Ok(OutputStatus {
            output_table: self.config.output_table().to_string(),
            exists,
            last_date,
            last_identifier,
            latest_publish_month: last_date.map(publish_month),
        })
    }

    /// Connect; a failed attempt still releases whatever was acquired
    async fn open(&self) -> PublishResult<()> {
        log::debug!("Connecting to {}", self.db.db_type());
        if let Err(e) = self.db.connect().await {
            if let Err(close_err) = self.db.close().await {
                log::warn!("Close after failed connect also failed: {close_err}");
            }
            return Err(PublishError::database("connect", e));
        }
        Ok(())
    }

    /// End the transaction according to `result` and always close
    async fn finish<T>(
        &self,
        operation: &str,
        result: PublishResult<T>,
        completion: Completion,
    ) -> PublishResult<T> {
        let result = match (result, completion) {
            (Ok(value), Completion::Commit) => match self.db.commit().await {
                Ok(()) => {
                    log::debug!("{operation}: committed");
                    Ok(value)
                }
                Err(e) => {
                    self.rollback_quietly(operation).await;
                    Err(PublishError::database("commit", e))
                }
            },
            (Ok(value), Completion::Discard) => {
                self.rollback_quietly(operation).await;
                Ok(value)
            }
            (Err(e), _) => {
                log::error!("{operation} failed, rolling back: {e}");
                self.rollback_quietly(operation).await;
                Err(e)
            }
        };

        if let Err(e) = self.db.close().await {
            log::warn!("{operation}: closing the connection failed: {e}");
        }
        result
    }

    async fn rollback_quietly(&self, operation: &str) {
        if let Err(e) = self.db.rollback().await {
            log::warn!("{operation}: rollback failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
