//! Database capability trait

use crate::error::DbResult;
use crate::value::Rows;
use async_trait::async_trait;

/// Database capability driven by the intersection orchestrator.
///
/// A backend owns at most one open connection at a time. Transactions follow
/// driver semantics: the first `execute` or `fetch` after `connect`, `commit`
/// or `rollback` opens a transaction implicitly, and `close` rolls back any
/// transaction still open before releasing the connection.
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Open the connection
    async fn connect(&self) -> DbResult<()>;

    /// Execute a statement that returns no rows
    async fn execute(&self, sql: &str) -> DbResult<()>;

    /// Execute a query and return every row
    async fn fetch(&self, sql: &str) -> DbResult<Rows>;

    /// Commit the open transaction, if any
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction, if any
    async fn rollback(&self) -> DbResult<()>;

    /// Release the connection; a no-op when none is open
    async fn close(&self) -> DbResult<()>;

    /// Whether `SAVEPOINT` / `ROLLBACK TO SAVEPOINT` can fence off a failed
    /// statement. Backends that abort the whole transaction on any error
    /// should return `true`.
    fn supports_savepoints(&self) -> bool {
        false
    }

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
