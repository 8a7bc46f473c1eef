//! PostgreSQL (PostGIS) database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use crate::value::{Rows, ScalarValue};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo};
use tokio::sync::{Mutex, MutexGuard};

/// An open connection plus its transaction flag.
struct PgSession {
    conn: PgConnection,
    in_transaction: bool,
}

impl PgSession {
    async fn begin_if_needed(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.conn
                .execute(sqlx::raw_sql("BEGIN"))
                .await
                .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn end_transaction(&mut self, stmt: &str) -> DbResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn
            .execute(sqlx::raw_sql(stmt))
            .await
            .map(|_| ())
            .map_err(|e| DbError::TransactionError(format!("{stmt} failed: {e}")))
    }
}

/// PostgreSQL database backend
///
/// Owns a single connection, opened by `connect` and released by `close`.
pub struct PostgresBackend {
    options: PgConnectOptions,
    session: Mutex<Option<PgSession>>,
}

impl PostgresBackend {
    /// Create a backend from explicit connect options
    pub fn new(options: PgConnectOptions) -> Self {
        Self {
            options,
            session: Mutex::new(None),
        }
    }

    /// Create a backend from individual connection parameters.
    ///
    /// Parameters left as `None` keep the driver defaults, which read the
    /// standard `PGHOST`, `PGPORT`, `PGDATABASE`, `PGUSER` and `PGPASSWORD`
    /// environment variables.
    pub fn from_params(
        host: Option<&str>,
        port: Option<u16>,
        dbname: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        let mut options = PgConnectOptions::new();
        if let Some(host) = host {
            options = options.host(host);
        }
        if let Some(port) = port {
            options = options.port(port);
        }
        if let Some(dbname) = dbname {
            options = options.database(dbname);
        }
        if let Some(user) = user {
            options = options.username(user);
        }
        if let Some(password) = password {
            options = options.password(password);
        }
        Self::new(options)
    }

    async fn open_session(&self) -> DbResult<MutexGuard<'_, Option<PgSession>>> {
        let guard = self.session.lock().await;
        if guard.is_none() {
            return Err(DbError::NotConnected);
        }
        Ok(guard)
    }
}

/// Decode one column of a row into the scalar model
fn decode_column(row: &PgRow, idx: usize) -> DbResult<ScalarValue> {
    let type_name = row.column(idx).type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .map(|v| v.map(ScalarValue::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .map(|v| v.map(|n| ScalarValue::Int(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .map(|v| v.map(|n| ScalarValue::Int(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map(|v| v.map(ScalarValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|x| ScalarValue::Float(x.into()))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map(ScalarValue::Float)),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(ScalarValue::Date)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map(|v| v.map(ScalarValue::Text)),
        _ => {
            return Err(DbError::UnsupportedType {
                column: idx,
                type_name,
            })
        }
    };
    decoded
        .map(|v| v.unwrap_or(ScalarValue::Null))
        .map_err(|e| DbError::FetchError(format!("column {idx} ({type_name}): {e}")))
}

#[async_trait]
impl Database for PostgresBackend {
    async fn connect(&self) -> DbResult<()> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Err(DbError::ConnectionError(
                "a connection is already open".to_string(),
            ));
        }
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        *guard = Some(PgSession {
            conn,
            in_transaction: false,
        });
        Ok(())
    }

    async fn execute(&self, sql: &str) -> DbResult<()> {
        let mut guard = self.open_session().await?;
        let session = guard.as_mut().ok_or(DbError::NotConnected)?;
        session.begin_if_needed().await?;
        session
            .conn
            .execute(sqlx::raw_sql(sql))
            .await
            .map(|_| ())
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    async fn fetch(&self, sql: &str) -> DbResult<Rows> {
        let mut guard = self.open_session().await?;
        let session = guard.as_mut().ok_or(DbError::NotConnected)?;
        session.begin_if_needed().await?;
        let rows = session
            .conn
            .fetch_all(sqlx::query(sql))
            .await
            .map_err(|e| DbError::FetchError(format!("{e}: {sql}")))?;

        rows.iter()
            .map(|row| (0..row.len()).map(|i| decode_column(row, i)).collect())
            .collect()
    }

    async fn commit(&self) -> DbResult<()> {
        let mut guard = self.open_session().await?;
        let session = guard.as_mut().ok_or(DbError::NotConnected)?;
        session.end_transaction("COMMIT").await
    }

    async fn rollback(&self) -> DbResult<()> {
        let mut guard = self.open_session().await?;
        let session = guard.as_mut().ok_or(DbError::NotConnected)?;
        session.end_transaction("ROLLBACK").await
    }

    async fn close(&self) -> DbResult<()> {
        let session = self.session.lock().await.take();
        if let Some(mut session) = session {
            if let Err(e) = session.end_transaction("ROLLBACK").await {
                log::warn!("Rollback on close failed: {e}");
            }
            session
                .conn
                .close()
                .await
                .map_err(|e| DbError::ConnectionError(format!("close failed: {e}")))?;
        }
        Ok(())
    }

    fn supports_savepoints(&self) -> bool {
        true
    }

    fn db_type(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operations_require_connection() {
        let db = PostgresBackend::from_params(Some("localhost"), Some(5432), None, None, None);
        assert_eq!(db.db_type(), "postgres");
        assert!(matches!(
            db.execute("SELECT 1").await,
            Err(DbError::NotConnected)
        ));
        assert!(matches!(
            db.fetch("SELECT 1").await,
            Err(DbError::NotConnected)
        ));
        assert!(matches!(db.commit().await, Err(DbError::NotConnected)));
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_operation_futures_are_send() {
        let db = PostgresBackend::new(PgConnectOptions::new());
        assert_send(&db.connect());
        assert_send(&db.execute("SELECT 1"));
        assert_send(&db.fetch("SELECT 1"));
        assert_send(&db.commit());
        assert_send(&db.rollback());
        assert_send(&db.close());
        assert!(db.supports_savepoints());
    }

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let db = PostgresBackend::new(PgConnectOptions::new());
        db.close().await.unwrap();
    }
}
