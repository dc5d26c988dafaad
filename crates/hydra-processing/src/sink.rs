//! Store sink
//!
//! Persists the canonical bytes of an upload. The outcome is reported twice: as the
//! task result for the orchestrator and over a oneshot for the aggregator.

use hydra_core::{AppError, FileRecord, MetadataStore};
use hydra_storage::Storage;
use std::io;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::fanout::ErrorSink;
use crate::pipe::PipeReader;

/// `Some` with the sized record once canonical bytes are stored, `None` on failure
pub type StoredSender = oneshot::Sender<Option<FileRecord>>;
pub type StoredReceiver = oneshot::Receiver<Option<FileRecord>>;

async fn store(
    storage: &dyn Storage,
    mut record: FileRecord,
    reader: &mut PipeReader,
) -> Result<FileRecord, AppError> {
    let stored = storage.save(&record, reader).await.map_err(AppError::from)?;

    if stored.size == 0 {
        if let Err(e) = storage.delete(record.id).await {
            warn!(file_id = %record.id, error = %e, "Failed to remove empty blob");
        }
        return Err(AppError::StorageFailure(format!("file {} is empty", record.id)));
    }

    record.size = stored.size;
    Ok(record)
}

/// Every sink failure is fatal storage failure, whatever the backend reported
fn storage_failure(err: &AppError) -> AppError {
    match err {
        AppError::StorageFailure(message) => AppError::StorageFailure(message.clone()),
        other => AppError::StorageFailure(other.to_string()),
    }
}

/// Save `reader` as the canonical bytes of `record` on its own task.
pub fn spawn_sink(
    storage: Arc<dyn Storage>,
    metadata_store: Arc<dyn MetadataStore>,
    record: FileRecord,
    mut reader: PipeReader,
    errors: ErrorSink,
    stored_tx: StoredSender,
) -> JoinHandle<Result<FileRecord, AppError>> {
    tokio::spawn(async move {
        let file_id = record.id;
        match store(storage.as_ref(), record, &mut reader).await {
            Ok(record) => {
                info!(file_id = %file_id, size_bytes = record.size, "Canonical bytes stored");
                if let Err(e) = metadata_store.add_file(&record).await {
                    warn!(file_id = %file_id, error = %e, "Failed to register file record");
                }
                let _ = stored_tx.send(Some(record.clone()));
                Ok(record)
            }
            Err(err) => {
                warn!(file_id = %file_id, error = %err, "Store sink failed");
                errors.push(storage_failure(&err));
                reader.close_with_error(&io::Error::new(io::ErrorKind::Other, err.to_string()));
                let _ = stored_tx.send(None);
                Err(storage_failure(&err))
            }
        }
    })
}
