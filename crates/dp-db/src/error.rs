//! Error types for dp-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Query or row decoding error (D003)
    #[error("[D003] SQL fetch failed: {0}")]
    FetchError(String),

    /// BEGIN / COMMIT / ROLLBACK failed (D004)
    #[error("[D004] Transaction control failed: {0}")]
    TransactionError(String),

    /// Operation issued without an open connection (D005)
    #[error("[D005] No open database connection")]
    NotConnected,

    /// Column type the scalar model cannot represent (D006)
    #[error("[D006] Unsupported column type {type_name} at position {column}")]
    UnsupportedType { column: usize, type_name: String },

    /// Mutex poisoned (D007)
    #[error("[D007] Database mutex poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;
