use thiserror::Error;

use crate::core::client::auth::AuthError;
use crate::core::client::storage::StorageError;
use crate::core::error::FetchError;
use crate::types::work::WorkKind;

/// Result type for collector operations
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Error types for the collector
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Fetch error: {0}")]
    FetchError(#[from] FetchError),

    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    /// Missing or invalid configuration, detected before any network call
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Setup error: {0}")]
    SetupError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{kind} collection aborted after {failed} failed units")]
    Aborted { kind: WorkKind, failed: u64 },

    #[error("Collector Error: {0}")]
    CollectorAnyHowError(#[from] anyhow::Error),
}
