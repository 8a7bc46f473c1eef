//! Connected database handle used by every pipeline component.

use crate::error::{PublishError, PublishResult};
use dp_db::{Database, Rows};

/// A database whose connection is open for the current operation.
///
/// Only the orchestrator creates sessions, right after a successful
/// `connect`; components borrow it and never commit, roll back or close.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    db: &'a dyn Database,
}

impl<'a> Session<'a> {
    /// Wrap an already connected database
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Whether the backend can fence off a failed statement with a savepoint
    pub fn supports_savepoints(&self) -> bool {
        self.db.supports_savepoints()
    }

    /// Execute a statement, tagging failures with `context`
    pub async fn execute(&self, context: &str, sql: &str) -> PublishResult<()> {
        log::debug!("[{context}] {sql}");
        self.db
            .execute(sql)
            .await
            .map_err(|source| PublishError::database(context, source))
    }

    /// Run a query, tagging failures with `context`
    pub async fn fetch(&self, context: &str, sql: &str) -> PublishResult<Rows> {
        log::debug!("[{context}] {sql}");
        self.db
            .fetch(sql)
            .await
            .map_err(|source| PublishError::database(context, source))
    }
}
