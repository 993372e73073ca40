//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("Media error: {0}")]
    Media(#[from] lscan_media::MediaError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] lscan_firestore::FirestoreError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn usage_error(msg: impl Into<String>) -> Self {
        Self::UsageError(msg.into())
    }
}
