//! Per-upload metadata aggregate
//!
//! Processors of one upload register their results here. All access goes through a
//! single mutex owned by that upload.

use hydra_core::{Meta, ThumbnailName, ThumbnailRef, Thumbnails};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Results produced by the processors of one upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaData {
    pub meta: Option<Meta>,
    pub thumbnails: Thumbnails,
}

/// Handle shared by the processors and the aggregator of one upload
#[derive(Debug, Clone, Default)]
pub struct SharedMetaData {
    inner: Arc<Mutex<MetaData>>,
}

impl SharedMetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_meta(&self, meta: Meta) {
        let mut data = self.inner.lock().await;
        if let Some(previous) = data.meta.replace(meta) {
            tracing::debug!(kind = previous.kind(), "Replacing previously extracted metadata");
        }
    }

    pub async fn register_thumbnail(&self, name: ThumbnailName, thumbnail: ThumbnailRef) {
        let mut data = self.inner.lock().await;
        if let Some(previous) = data.thumbnails.insert(name, thumbnail) {
            tracing::debug!(name = %name, previous_id = %previous.id, "Replacing thumbnail");
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> MetaData {
        self.inner.lock().await.clone()
    }
}
