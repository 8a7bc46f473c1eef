//! Error types for dp-core

use thiserror::Error;

/// Core error type for deter-publish
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to read configuration file
    #[error("[C002] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C003: Required configuration key is absent
    #[error("[C003] Missing required parameter '{key}'")]
    MissingParameter { key: String },

    /// C004: Configured name is not a plain SQL identifier
    #[error("[C004] Invalid identifier for '{key}': '{value}' (expected letters, digits and underscores, not starting with a digit)")]
    InvalidIdentifier { key: String, value: String },

    /// C005: Invalid configuration value
    #[error("[C005] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C006: YAML parse error
    #[error("[C006] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
