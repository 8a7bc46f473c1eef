//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use crate::value::{Rows, ScalarValue};
use ::duckdb::types::Value;
use ::duckdb::Connection;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Days from 0001-01-01 to 1970-01-01; DuckDB dates count from the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// An open connection plus its transaction flag.
struct Session {
    conn: Connection,
    in_transaction: bool,
}

impl Session {
    fn begin_if_needed(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.conn
                .execute_batch("BEGIN TRANSACTION")
                .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn end_transaction(&mut self, stmt: &str) -> DbResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn
            .execute_batch(stmt)
            .map_err(|e| DbError::TransactionError(format!("{stmt} failed: {e}")))
    }
}

/// DuckDB database backend
///
/// Holds a root connection for the lifetime of the backend; `connect` clones
/// it, so an in-memory database keeps its contents across the scoped sessions
/// each public operation opens and closes.
pub struct DuckDbBackend {
    root: Mutex<Connection>,
    session: Mutex<Option<Session>>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB database
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_root(conn))
    }

    /// Open a DuckDB database from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::with_root(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_root(conn: Connection) -> Self {
        Self {
            root: Mutex::new(conn),
            session: Mutex::new(None),
        }
    }

    fn lock_session(&self) -> DbResult<MutexGuard<'_, Option<Session>>> {
        self.session
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Run `body` against the open session
    fn with_session<T>(&self, body: impl FnOnce(&mut Session) -> DbResult<T>) -> DbResult<T> {
        let mut guard = self.lock_session()?;
        let session = guard.as_mut().ok_or(DbError::NotConnected)?;
        body(session)
    }

    fn connect_sync(&self) -> DbResult<()> {
        let mut guard = self.lock_session()?;
        if guard.is_some() {
            return Err(DbError::ConnectionError(
                "a connection is already open".to_string(),
            ));
        }
        let conn = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        *guard = Some(Session {
            conn,
            in_transaction: false,
        });
        Ok(())
    }

    fn execute_sync(&self, sql: &str) -> DbResult<()> {
        self.with_session(|session| {
            session.begin_if_needed()?;
            session
                .conn
                .execute_batch(sql)
                .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
        })
    }

    fn fetch_sync(&self, sql: &str) -> DbResult<Rows> {
        self.with_session(|session| {
            session.begin_if_needed()?;
            let mut stmt = session
                .conn
                .prepare(sql)
                .map_err(|e| DbError::FetchError(format!("{e}: {sql}")))?;

            // DuckDB 1.4 panics on `stmt.column_count()` before execution, so
            // the column count is read from each row instead.
            let raw_rows: Vec<Vec<Value>> = stmt
                .query_map([], |row| {
                    let col_count = row.as_ref().column_count();
                    (0..col_count)
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<Result<Vec<_>, _>>()
                })
                .map_err(|e| DbError::FetchError(format!("{e}: {sql}")))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DbError::FetchError(format!("row error: {e}")))?;

            raw_rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .enumerate()
                        .map(|(i, v)| to_scalar(i, v))
                        .collect()
                })
                .collect()
        })
    }

    fn close_sync(&self) -> DbResult<()> {
        let session = self.lock_session()?.take();
        if let Some(mut session) = session {
            if let Err(e) = session.end_transaction("ROLLBACK") {
                log::warn!("Rollback on close failed: {e}");
            }
        }
        Ok(())
    }
}

/// Convert a DuckDB value into the scalar model
fn to_scalar(column: usize, value: Value) -> DbResult<ScalarValue> {
    let scalar = match value {
        Value::Null => ScalarValue::Null,
        Value::Boolean(b) => ScalarValue::Bool(b),
        Value::TinyInt(n) => ScalarValue::Int(n.into()),
        Value::SmallInt(n) => ScalarValue::Int(n.into()),
        Value::Int(n) => ScalarValue::Int(n.into()),
        Value::BigInt(n) => ScalarValue::Int(n),
        Value::UTinyInt(n) => ScalarValue::Int(n.into()),
        Value::USmallInt(n) => ScalarValue::Int(n.into()),
        Value::UInt(n) => ScalarValue::Int(n.into()),
        Value::HugeInt(n) => {
            ScalarValue::Int(i64::try_from(n).map_err(|_| DbError::UnsupportedType {
                column,
                type_name: format!("HUGEINT out of range ({n})"),
            })?)
        }
        Value::Float(x) => ScalarValue::Float(x.into()),
        Value::Double(x) => ScalarValue::Float(x),
        Value::Text(s) => ScalarValue::Text(s),
        Value::Date32(days) => {
            let date = days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| DbError::UnsupportedType {
                    column,
                    type_name: format!("DATE out of range ({days})"),
                })?;
            ScalarValue::Date(date)
        }
        other => {
            return Err(DbError::UnsupportedType {
                column,
                type_name: format!("{other:?}"),
            })
        }
    };
    Ok(scalar)
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn connect(&self) -> DbResult<()> {
        self.connect_sync()
    }

    async fn execute(&self, sql: &str) -> DbResult<()> {
        self.execute_sync(sql)
    }

    async fn fetch(&self, sql: &str) -> DbResult<Rows> {
        self.fetch_sync(sql)
    }

    async fn commit(&self) -> DbResult<()> {
        self.with_session(|session| session.end_transaction("COMMIT"))
    }

    async fn rollback(&self) -> DbResult<()> {
        self.with_session(|session| session.end_transaction("ROLLBACK"))
    }

    async fn close(&self) -> DbResult<()> {
        self.close_sync()
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
