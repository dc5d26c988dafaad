//! Metadata store collaborator
//!
//! The pipeline reports the canonical record, its type-specific metadata, its
//! dimensions and its thumbnail set through this trait. The backing model layer
//! lives outside this workspace; `InMemoryMetadataStore` serves the CLI and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{FileRecord, Meta, Thumbnails};

/// Trait for persisting upload results to the model layer
///
/// Failures are reported as strings and are never retried by the pipeline.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Register the base record once canonical bytes are stored
    async fn add_file(&self, record: &FileRecord) -> Result<(), String>;

    /// Attach type-specific metadata
    async fn set_metadata(&self, id: Uuid, meta: &Meta) -> Result<(), String>;

    /// Record width and height
    async fn set_dimension(&self, id: Uuid, width: u32, height: u32) -> Result<(), String>;

    /// Attach the thumbnail set
    async fn set_thumbnails(&self, id: Uuid, thumbnails: &Thumbnails) -> Result<(), String>;
}

/// No-op implementation for callers without a model layer
pub struct NoOpMetadataStore;

#[async_trait]
impl MetadataStore for NoOpMetadataStore {
    async fn add_file(&self, _record: &FileRecord) -> Result<(), String> {
        Ok(())
    }

    async fn set_metadata(&self, _id: Uuid, _meta: &Meta) -> Result<(), String> {
        Ok(())
    }

    async fn set_dimension(&self, _id: Uuid, _width: u32, _height: u32) -> Result<(), String> {
        Ok(())
    }

    async fn set_thumbnails(&self, _id: Uuid, _thumbnails: &Thumbnails) -> Result<(), String> {
        Ok(())
    }
}

/// Process-local store keyed by file ID
#[derive(Default)]
pub struct InMemoryMetadataStore {
    files: RwLock<HashMap<Uuid, FileRecord>>,
    metadata: RwLock<HashMap<Uuid, Meta>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view of a record, including merged dimensions and thumbnails
    pub async fn file(&self, id: Uuid) -> Option<FileRecord> {
        self.files.read().await.get(&id).cloned()
    }

    pub async fn metadata(&self, id: Uuid) -> Option<Meta> {
        self.metadata.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn add_file(&self, record: &FileRecord) -> Result<(), String> {
        let mut files = self.files.write().await;
        if files.contains_key(&record.id) {
            return Err(format!("file {} already registered", record.id));
        }
        files.insert(record.id, record.clone());
        Ok(())
    }

    async fn set_metadata(&self, id: Uuid, meta: &Meta) -> Result<(), String> {
        if !self.files.read().await.contains_key(&id) {
            return Err(format!("file {} not registered", id));
        }
        self.metadata.write().await.insert(id, meta.clone());
        Ok(())
    }

    async fn set_dimension(&self, id: Uuid, width: u32, height: u32) -> Result<(), String> {
        let mut files = self.files.write().await;
        let record = files
            .get_mut(&id)
            .ok_or_else(|| format!("file {} not registered", id))?;
        record.width = Some(width);
        record.height = Some(height);
        Ok(())
    }

    async fn set_thumbnails(&self, id: Uuid, thumbnails: &Thumbnails) -> Result<(), String> {
        let mut files = self.files.write().await;
        let record = files
            .get_mut(&id)
            .ok_or_else(|| format!("file {} not registered", id))?;
        record.thumbnails = thumbnails.clone();
        Ok(())
    }
}
