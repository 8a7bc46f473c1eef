//! Scratch tables and the run-scoped identifier sequence.

use crate::error::PublishResult;
use crate::session::Session;
use crate::statements::Statements;

/// Manages the jobber tables and the `gid` sequence of one run
pub struct IntermediaryTables<'a> {
    session: Session<'a>,
    statements: Statements<'a>,
}

impl<'a> IntermediaryTables<'a> {
    /// Create a manager bound to an open session
    pub fn new(session: Session<'a>, statements: Statements<'a>) -> Self {
        Self {
            session,
            statements,
        }
    }

    /// Drop every configured jobber table; absent tables are not an error
    pub async fn drop_all(&self) -> PublishResult<()> {
        for sql in self.statements.drop_jobber_tables() {
            self.session.execute("drop intermediary tables", &sql).await?;
        }
        Ok(())
    }

    /// Create the sequence, starting at 1
    pub async fn create_sequence(&self) -> PublishResult<()> {
        self.session
            .execute("create sequence", &self.statements.create_sequence())
            .await
    }

    /// Re-anchor the sequence so the next value handed out is `start`
    pub async fn reset_sequence(&self, start: i64) -> PublishResult<()> {
        log::debug!("Restarting identifier sequence at {start}");
        self.session
            .execute("reset sequence", &self.statements.reset_sequence(start))
            .await
    }

    /// Drop the sequence at the end of the run
    pub async fn drop_sequence(&self) -> PublishResult<()> {
        self.session
            .execute("drop sequence", &self.statements.drop_sequence())
            .await
    }
}
