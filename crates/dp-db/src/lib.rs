//! dp-db - Database capability layer for deter-publish
//!
//! This crate provides the `Database` trait the orchestrator drives
//! (connect, execute, fetch, commit, rollback, close) and its backends:
//! PostgreSQL through sqlx for production and DuckDB for embedded use.
//! With the `test-support` feature it also exposes a scripted backend that
//! records statements and injects faults.

pub mod duckdb;
pub mod error;
pub mod postgres;
#[cfg(feature = "test-support")]
pub mod testing;
pub mod traits;
pub mod value;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use crate::postgres::PostgresBackend;
pub use traits::Database;
pub use value::{single_value, Rows, ScalarValue};
