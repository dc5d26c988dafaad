//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use hydra_core::{AppError, FileRecord, Meta, Thumbnails};
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(key),
            other => AppError::StorageFailure(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub key: String,
    pub size: u64,
    pub url: String,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Files are content-addressed by the universal ID of the record they belong to.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream bytes from `reader` into the blob for `template.id` and return its final size.
    ///
    /// The reader is consumed until EOF. Nothing is buffered beyond one copy chunk.
    async fn save(
        &self,
        template: &FileRecord,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredFile>;

    /// Persist type-specific metadata for a stored file
    async fn set_meta(&self, id: Uuid, meta: &Meta) -> StorageResult<()>;

    /// Persist the thumbnail set for a stored file
    async fn set_thumbnails(&self, id: Uuid, thumbnails: &Thumbnails) -> StorageResult<()>;

    /// Load the canonical bytes of a file
    async fn load(&self, id: Uuid) -> StorageResult<Vec<u8>>;

    /// Delete a file together with its sidecars
    async fn delete(&self, id: Uuid) -> StorageResult<()>;

    /// Check if the canonical bytes of a file exist
    async fn exists(&self, id: Uuid) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
