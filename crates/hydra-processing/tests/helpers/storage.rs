//! In-memory `Storage` with failure injection and call counters.

use async_trait::async_trait;
use hydra_core::{FileRecord, FileStatus, Meta, StorageBackend, Thumbnails};
use hydra_storage::{Storage, StorageError, StorageResult, StoredFile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<Uuid, (FileRecord, Vec<u8>)>>,
    metas: Mutex<HashMap<Uuid, Meta>>,
    thumbnails: Mutex<HashMap<Uuid, Thumbnails>>,
    fail_canonical: bool,
    saves: AtomicUsize,
    thumbnail_writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every save that is not a derivative, without reading the stream
    pub fn failing_canonical() -> Self {
        Self {
            fail_canonical: true,
            ..Self::default()
        }
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn thumbnail_writes(&self) -> usize {
        self.thumbnail_writes.load(Ordering::SeqCst)
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.lock().await.len()
    }

    /// IDs of stored derivatives
    pub async fn derivative_ids(&self) -> Vec<Uuid> {
        self.blobs
            .lock()
            .await
            .values()
            .filter(|(record, _)| record.status == FileStatus::Thumbnail)
            .map(|(record, _)| record.id)
            .collect()
    }

    pub async fn meta(&self, id: Uuid) -> Option<Meta> {
        self.metas.lock().await.get(&id).cloned()
    }

    pub async fn thumbnails(&self, id: Uuid) -> Option<Thumbnails> {
        self.thumbnails.lock().await.get(&id).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(
        &self,
        template: &FileRecord,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredFile> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_canonical && template.status != FileStatus::Thumbnail {
            return Err(StorageError::UploadFailed("bucket unavailable".to_string()));
        }

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let size = data.len() as u64;
        self.blobs
            .lock()
            .await
            .insert(template.id, (template.clone(), data));
        Ok(StoredFile {
            id: template.id,
            key: template.id.to_string(),
            size,
            url: format!("memory://{}", template.id),
        })
    }

    async fn set_meta(&self, id: Uuid, meta: &Meta) -> StorageResult<()> {
        self.metas.lock().await.insert(id, meta.clone());
        Ok(())
    }

    async fn set_thumbnails(&self, id: Uuid, thumbnails: &Thumbnails) -> StorageResult<()> {
        self.thumbnail_writes.fetch_add(1, Ordering::SeqCst);
        self.thumbnails.lock().await.insert(id, thumbnails.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> StorageResult<Vec<u8>> {
        self.blobs
            .lock()
            .await
            .get(&id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: Uuid) -> StorageResult<()> {
        self.blobs.lock().await.remove(&id);
        self.metas.lock().await.remove(&id);
        self.thumbnails.lock().await.remove(&id);
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.blobs.lock().await.contains_key(&id))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
