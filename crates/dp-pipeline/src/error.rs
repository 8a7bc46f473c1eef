//! Error types for dp-pipeline

use dp_core::CoreError;
use dp_db::DbError;
use thiserror::Error;

/// Errors surfaced by the intersection orchestrator
#[derive(Error, Debug)]
pub enum PublishError {
    /// Configuration could not be used (P001); wraps missing parameters and
    /// invalid identifiers.
    #[error("[P001] Configuration error: {0}")]
    Config(#[from] CoreError),

    /// Any connect, execute, fetch or commit failure (P002). The transaction
    /// has already been rolled back when a public operation returns this.
    #[error("[P002] Database error while trying to {context}: {source}")]
    Database {
        context: String,
        #[source]
        source: DbError,
    },
}

impl PublishError {
    /// Wrap a backend error with the step that was running
    pub fn database(context: impl Into<String>, source: DbError) -> Self {
        PublishError::Database {
            context: context.into(),
            source,
        }
    }

    /// `true` when a required configuration key was absent
    pub fn is_missing_parameter(&self) -> bool {
        matches!(
            self,
            PublishError::Config(CoreError::MissingParameter { .. })
        )
    }
}

/// Result type alias for PublishError
pub type PublishResult<T> = Result<T, PublishError>;
