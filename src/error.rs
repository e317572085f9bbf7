//! Error types
//!
//! `StoreError` covers the record-store collaborator; `ApiError` is what the
//! cache, configuration and CLI surfaces return to their callers.

use thiserror::Error;

/// Errors raised by record-store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is not ready (host not started, snapshot missing, ...)
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(String),
}

/// Errors surfaced to callers of the public API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Projection path does not start with `/`
    #[error("Invalid path '{0}': only absolute paths are allowed")]
    InvalidPath(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
