//! Incremental state of the output table.
//!
//! The existence check is an ordinary query and its failure fails the run.
//! The two baseline reads never do: a failed `MAX` query is reported as
//! [`Lookup::Failed`] and then treated like an absent value, so the default
//! outcome is a full staging with numbering restarted. On backends where a
//! failed statement aborts the transaction, each read runs inside the
//! [`BASELINE_SAVEPOINT`] savepoint and a failure is rolled back to it.

use crate::error::{PublishError, PublishResult};
use crate::session::Session;
use crate::statements::{Statements, BASELINE_SAVEPOINT};
use chrono::NaiveDate;
use dp_db::{single_value, DbError, ScalarValue};

/// Identifier assumed when the output table holds none
pub const DEFAULT_LAST_IDENTIFIER: i64 = 1;

/// Outcome of a baseline read
#[derive(Debug)]
pub enum Lookup<T> {
    /// The output table exists and yielded a value
    Found(T),
    /// The output table is absent or holds no value
    Absent,
    /// The query failed; callers fall back as for `Absent`
    Failed(PublishError),
}

impl<T> Lookup<T> {
    /// The value, if one was found
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent | Lookup::Failed(_) => None,
        }
    }

    /// `true` when the query itself failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }

    /// The found value or `default`, logging a warning when the query failed
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Lookup::Found(value) => value,
            Lookup::Absent => default,
            Lookup::Failed(e) => {
                log::warn!("Baseline read failed, falling back to default: {e}");
                default
            }
        }
    }
}

/// Reads the last processed date and identifier of the output table
pub struct StateTracker<'a> {
    session: Session<'a>,
    statements: Statements<'a>,
}

impl<'a> StateTracker<'a> {
    /// Create a tracker bound to an open session
    pub fn new(session: Session<'a>, statements: Statements<'a>) -> Self {
        Self {
            session,
            statements,
        }
    }

    /// Whether the output table is present
    pub async fn output_table_exists(&self) -> PublishResult<bool> {
        const CONTEXT: &str = "check output table";
        let rows = self
            .session
            .fetch(CONTEXT, &self.statements.output_table_exists())
            .await?;
        single_value(&rows)
            .and_then(ScalarValue::as_bool)
            .ok_or_else(|| {
                PublishError::database(
                    CONTEXT,
                    DbError::FetchError(format!("expected a single boolean, got {rows:?}")),
                )
            })
    }

    /// Most recent creation date in the output table
    pub async fn last_date(&self) -> PublishResult<Lookup<NaiveDate>> {
        if !self.output_table_exists().await? {
            return Ok(Lookup::Absent);
        }
        self.read_fenced(
            "read last date",
            &self.statements.max_created_date(),
            ScalarValue::as_date,
        )
        .await
    }

    /// Highest `gid` in the output table
    pub async fn last_identifier(&self) -> PublishResult<Lookup<i64>> {
        if !self.output_table_exists().await? {
            return Ok(Lookup::Absent);
        }
        self.read_fenced(
            "read last identifier",
            &self.statements.max_gid(),
            ScalarValue::as_i64,
        )
        .await
    }

    /// Last creation date, or `None` when there is no usable baseline
    pub async fn get_last_date(&self) -> PublishResult<Option<NaiveDate>> {
        Ok(match self.last_date().await? {
            Lookup::Failed(e) => {
                log::warn!("Could not read last date, assuming none: {e}");
                None
            }
            lookup => lookup.found(),
        })
    }

    /// Last identifier, or [`DEFAULT_LAST_IDENTIFIER`]. The next free
    /// identifier is the result plus one.
    pub async fn get_last_identifier(&self) -> PublishResult<i64> {
        Ok(self
            .last_identifier()
            .await?
            .unwrap_or(DEFAULT_LAST_IDENTIFIER))
    }

    /// Run a single-value read whose failure must not poison the transaction.
    ///
    /// Only the read itself is swallowed; failing to open, release or roll
    /// back to the savepoint is an error.
    async fn read_fenced<T>(
        &self,
        context: &str,
        sql: &str,
        extract: fn(&ScalarValue) -> Option<T>,
    ) -> PublishResult<Lookup<T>> {
        let stmts = self.statements;
        let fenced = self.session.supports_savepoints();
        if fenced {
            self.session
                .execute(context, &stmts.savepoint(BASELINE_SAVEPOINT))
                .await?;
        }

        let result = self.session.fetch(context, sql).await;

        if fenced {
            let settle = match &result {
                Ok(_) => stmts.release_savepoint(BASELINE_SAVEPOINT),
                Err(_) => stmts.rollback_to_savepoint(BASELINE_SAVEPOINT),
            };
            self.session.execute(context, &settle).await?;
        }

        Ok(match result {
            Ok(rows) => match single_value(&rows).and_then(extract) {
                Some(value) => Lookup::Found(value),
                None => Lookup::Absent,
            },
            Err(e) => Lookup::Failed(e),
        })
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
