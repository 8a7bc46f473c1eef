//! Staging, county join and conservation-unit join.

use crate::error::PublishResult;
use crate::jobber::IntermediaryTables;
use crate::session::Session;
use crate::statements::{Statements, WORK_GEOMETRY_COLUMN};
use crate::tracker::StateTracker;
use chrono::NaiveDate;

/// How the county join reached the output table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The output table did not exist and was built from the join
    Created,
    /// Rows were appended, numbered from `first_gid`
    Appended { first_gid: i64 },
}

/// The ordered transformation steps of one run
pub struct IntersectionPipeline<'a> {
    session: Session<'a>,
    statements: Statements<'a>,
}

impl<'a> IntersectionPipeline<'a> {
    /// Create a pipeline bound to an open session
    pub fn new(session: Session<'a>, statements: Statements<'a>) -> Self {
        Self {
            session,
            statements,
        }
    }

    fn jobber(&self) -> IntermediaryTables<'a> {
        IntermediaryTables::new(self.session, self.statements)
    }

    fn tracker(&self) -> StateTracker<'a> {
        StateTracker::new(self.session, self.statements)
    }

    /// Stage alerts created after `since` (all alerts when `None`), number
    /// them from 1, annotate their total area and index their geometry.
    pub async fn populate_work_table(&self, since: Option<NaiveDate>) -> PublishResult<()> {
        const CONTEXT: &str = "populate intermediary table";
        match since {
            Some(date) => log::info!("Staging alerts created after {date}"),
            None => log::info!("Staging all alerts"),
        }

        self.jobber().reset_sequence(1).await?;
        let stmts = self.statements;
        self.session
            .execute(CONTEXT, &stmts.create_work_table(since))
            .await?;
        self.session
            .execute(CONTEXT, &stmts.add_total_area_column())
            .await?;
        self.session
            .execute(CONTEXT, &stmts.compute_total_area())
            .await?;

        let index = stmts.create_spatial_index(stmts.config().work_table(), WORK_GEOMETRY_COLUMN)?;
        self.session.execute(CONTEXT, &index).await
    }

    /// Join staged alerts with counties into the output table.
    ///
    /// Builds the table on first run; otherwise appends with identifiers
    /// continuing after the current maximum. Rows outside every county are
    /// removed either way.
    pub async fn intersect_counties(&self) -> PublishResult<JoinOutcome> {
        const CONTEXT: &str = "intersect counties";
        let stmts = self.statements;

        let outcome = if self.tracker().output_table_exists().await? {
            // An emptied table reports DEFAULT_LAST_IDENTIFIER, so numbering
            // after a renew starts at 2, not 1.
            let first_gid = self.tracker().get_last_identifier().await? + 1;
            log::info!("Appending to existing output, identifiers from {first_gid}");
            self.jobber().reset_sequence(first_gid).await?;
            self.session
                .execute(CONTEXT, &stmts.insert_output_from_join())
                .await?;
            JoinOutcome::Appended { first_gid }
        } else {
            log::info!("Output table absent, building it from scratch");
            self.jobber().reset_sequence(1).await?;
            self.session
                .execute(CONTEXT, &stmts.create_output_from_join())
                .await?;
            JoinOutcome::Created
        };

        self.session
            .execute(CONTEXT, &stmts.delete_unmatched())
            .await?;

        match outcome {
            JoinOutcome::Created => self.finalize_output_schema().await?,
            JoinOutcome::Appended { .. } => {
                self.session
                    .execute(CONTEXT, &stmts.backfill_publish_month())
                    .await?
            }
        }
        Ok(outcome)
    }

    /// First build only: publish month column, clustering, key and indexes
    async fn finalize_output_schema(&self) -> PublishResult<()> {
        const CONTEXT: &str = "finalize output table";
        let stmts = self.statements;
        for sql in [
            stmts.add_publish_month_column(),
            stmts.backfill_publish_month(),
            stmts.create_publish_month_index(),
            stmts.cluster_on_publish_month(),
            stmts.set_gid_not_null(),
            stmts.add_gid_primary_key(),
            stmts.create_output_geometry_index()?,
        ] {
            self.session.execute(CONTEXT, &sql).await?;
        }
        Ok(())
    }

    /// Fill conservation-unit area and name on overlapping output rows
    pub async fn intersect_conservation_units(&self) -> PublishResult<()> {
        // The update does not consume the sequence.
        self.jobber().reset_sequence(1).await?;
        self.session
            .execute(
                "intersect conservation units",
                &self.statements.update_conservation_units(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{publish_config, scripted_with_exists, single, MAX_GID};
    use dp_db::{Database, ScalarValue};

    #[tokio::test]
    async fn test_populate_restarts_sequence_before_staging() {
        let cfg = publish_config();
        let db = scripted_with_exists(&[]);
        db.connect().await.unwrap();
        let pipeline = IntersectionPipeline::new(Session::new(db.as_ref()), Statements::new(&cfg));

        pipeline.populate_work_table(None).await.unwrap();

        let executed = db.executed();
        assert_eq!(executed.len(), 5);
        assert!(executed[0].ends_with("RESTART WITH 1"));
        assert!(executed[1].starts_with(r#"CREATE TABLE "jobber"."deter_tmp""#));
        assert!(executed[2].contains("ADD COLUMN area_total_km"));
        assert!(executed[3].contains("SET area_total_km"));
        assert!(executed[4].contains("USING gist (geometries)"));
    }

    #[tokio::test]
    async fn test_first_build_creates_and_finalizes_output() {
        let cfg = publish_config();
        let db = scripted_with_exists(&[false]);
        db.connect().await.unwrap();
        let pipeline = IntersectionPipeline::new(Session::new(db.as_ref()), Statements::new(&cfg));

        let outcome = pipeline.intersect_counties().await.unwrap();
        assert_eq!(outcome, JoinOutcome::Created);

        let executed = db.executed();
        assert!(executed[0].ends_with("RESTART WITH 1"));
        assert!(executed[1].starts_with(r#"CREATE TABLE "public"."deter_publish" AS"#));
        assert!(executed[2].starts_with("DELETE FROM"));
        assert!(executed[3].contains("ADD COLUMN publish_month date"));
        assert!(executed[4].contains("SET publish_month"));
        assert!(executed[5].contains("publish_month_idx"));
        assert!(executed[6].contains("CLUSTER ON"));
        assert!(executed[7].contains("SET NOT NULL"));
        assert!(executed[8].contains("PRIMARY KEY"));
        assert!(executed[9].contains("deter_publish_geom_index"));
        assert_eq!(executed.len(), 10);
    }

    #[tokio::test]
    async fn test_incremental_appends_after_last_identifier() {
        let cfg = publish_config();
        let db = scripted_with_exists(&[true]);
        db.respond(MAX_GID, single(ScalarValue::Int(100)));
        db.connect().await.unwrap();
        let pipeline = IntersectionPipeline::new(Session::new(db.as_ref()), Statements::new(&cfg));

        let outcome = pipeline.intersect_counties().await.unwrap();
        assert_eq!(outcome, JoinOutcome::Appended { first_gid: 101 });

        let executed = db.executed();
        assert_eq!(executed.len(), 6);
        assert_eq!(executed[0], "SAVEPOINT dp_baseline");
        assert_eq!(executed[1], "RELEASE SAVEPOINT dp_baseline");
        assert!(executed[2].ends_with("RESTART WITH 101"));
        assert!(executed[3].starts_with(r#"INSERT INTO "public"."deter_publish""#));
        assert!(executed[4].starts_with("DELETE FROM"));
        assert!(executed[5].contains("SET publish_month"));
        assert!(db.executed_matching("PRIMARY KEY").is_empty());
    }

    #[tokio::test]
    async fn test_conservation_units_update_in_place() {
        let cfg = publish_config();
        let db = scripted_with_exists(&[]);
        db.connect().await.unwrap();
        let pipeline = IntersectionPipeline::new(Session::new(db.as_ref()), Statements::new(&cfg));

        pipeline.intersect_conservation_units().await.unwrap();

        let executed = db.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].ends_with("RESTART WITH 1"));
        assert!(executed[1].starts_with("WITH alerts_ucs AS"));
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_step() {
        let cfg = publish_config();
        let db = scripted_with_exists(&[false]);
        db.fail_on("CLUSTER ON");
        db.connect().await.unwrap();
        let pipeline = IntersectionPipeline::new(Session::new(db.as_ref()), Statements::new(&cfg));

        let err = pipeline.intersect_counties().await.unwrap_err();
        assert!(err.to_string().contains("finalize output table"));
        assert!(db.executed_matching("PRIMARY KEY").is_empty());
    }
}
