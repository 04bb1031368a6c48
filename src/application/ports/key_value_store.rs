use async_trait::async_trait;
use thiserror::Error;

use crate::shared::error::AppError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage medium unavailable: {0}")]
    Unavailable(String),

    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Durable key-value medium behind the offline queue. Values are opaque
/// serialized strings addressed by the queue's fixed namespaced keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
