//! Merges processor results into the stored record
//!
//! Runs once every processor of an upload has finished and the store sink has
//! reported. Metadata and thumbnails are persisted independently: a failure of one
//! is logged and does not block the other.

use hydra_core::{FileRecord, MetadataStore, Thumbnails};
use hydra_storage::Storage;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::completion::CompletionGroup;
use crate::metadata::{MetaData, SharedMetaData};
use crate::sink::StoredReceiver;

pub struct Aggregator {
    storage: Arc<dyn Storage>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl Aggregator {
    pub fn new(storage: Arc<dyn Storage>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self {
            storage,
            metadata_store,
        }
    }

    /// Wait for `group` and the store outcome, then merge.
    ///
    /// Returns the final record, or `None` when the canonical bytes were not stored.
    pub async fn run(
        &self,
        group: CompletionGroup,
        metadata: SharedMetaData,
        stored: StoredReceiver,
    ) -> Option<FileRecord> {
        group.wait().await;
        let stored = stored.await.ok().flatten();
        let results = metadata.snapshot().await;

        match stored {
            Some(record) => Some(self.merge(record, results).await),
            None => {
                self.discard_derivatives(&results.thumbnails).await;
                None
            }
        }
    }

    async fn merge(&self, mut record: FileRecord, results: MetaData) -> FileRecord {
        let id = record.id;

        if let Some(meta) = &results.meta {
            if let Err(e) = self.storage.set_meta(id, meta).await {
                warn!(file_id = %id, error = %e, "Failed to persist metadata sidecar");
            }
            if let Err(e) = self.metadata_store.set_metadata(id, meta).await {
                warn!(file_id = %id, error = %e, "Failed to record metadata");
            }
            if let Some((width, height)) = meta.dimensions() {
                record.width = Some(width);
                record.height = Some(height);
                if let Err(e) = self.metadata_store.set_dimension(id, width, height).await {
                    warn!(file_id = %id, error = %e, "Failed to record dimensions");
                }
            }
        }

        if !results.thumbnails.is_empty() {
            if let Err(e) = self.storage.set_thumbnails(id, &results.thumbnails).await {
                warn!(file_id = %id, error = %e, "Failed to persist thumbnail sidecar");
            }
            if let Err(e) = self
                .metadata_store
                .set_thumbnails(id, &results.thumbnails)
                .await
            {
                warn!(file_id = %id, error = %e, "Failed to record thumbnails");
            }
            record.thumbnails = results.thumbnails;
        }

        info!(
            file_id = %id,
            meta = results.meta.as_ref().map(|m| m.kind()).unwrap_or("none"),
            thumbnails = record.thumbnails.len(),
            "Upload results merged"
        );
        record
    }

    /// Best-effort removal of derivatives whose parent was never stored
    async fn discard_derivatives(&self, thumbnails: &Thumbnails) {
        for (name, thumbnail) in thumbnails.iter() {
            match self.storage.delete(thumbnail.id).await {
                Ok(()) => debug!(
                    name = %name,
                    derivative_id = %thumbnail.id,
                    "Orphaned derivative removed"
                ),
                Err(e) => warn!(
                    name = %name,
                    derivative_id = %thumbnail.id,
                    error = %e,
                    "Failed to remove orphaned derivative"
                ),
            }
        }
    }
}

pub fn spawn_aggregator(
    aggregator: Aggregator,
    group: CompletionGroup,
    metadata: SharedMetaData,
    stored: StoredReceiver,
) -> JoinHandle<Option<FileRecord>> {
    tokio::spawn(async move { aggregator.run(group, metadata, stored).await })
}
