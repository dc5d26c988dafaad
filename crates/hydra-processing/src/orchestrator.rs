//! Upload orchestration
//!
//! `UploadPipeline::upload_file` wires one upload: it resolves the plan, starts the
//! store branch (transform and sink), the processors and the aggregator, then drives
//! the rate-limited broadcast from the caller's task.

use hydra_core::constants::ANONYMOUS_UPLOADER_ID;
use hydra_core::{AppError, Config, FileRecord, MetadataStore, UploadType};
use hydra_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator::{spawn_aggregator, Aggregator};
use crate::completion::CompletionGroup;
use crate::converter::Converter;
use crate::fanout::{broadcast, error_channel, RateLimit};
use crate::metadata::SharedMetaData;
use crate::mime::{detect_mime_type, sanitize_filename};
use crate::pipe::{pipe, MultiWriter};
use crate::plan::{PipelineBuilder, Plan};
use crate::processor::{spawn_processor, ProcessorContext};
use crate::sink::spawn_sink;
use crate::transform::spawn_transform;

const DEFAULT_PREVIEW_MAX_WIDTH: u32 = 1024;

/// Tunables of the upload pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub rate_limit: RateLimit,
    pub preview_max_width: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimit::default(),
            preview_max_width: DEFAULT_PREVIEW_MAX_WIDTH,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            rate_limit: RateLimit {
                quota_bytes: config.upload_rate_limit_bytes(),
                tick: Duration::from_millis(config.upload_rate_tick_ms()),
                chunk_size: config.upload_chunk_size_bytes(),
            },
            preview_max_width: config.preview_max_width(),
        }
    }
}

/// One inbound upload
pub struct UploadRequest {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub filename: String,
    pub upload_type: UploadType,
    pub uploader_id: Uuid,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    /// Return once canonical bytes are stored, without waiting for processors
    pub early_response: bool,
}

impl UploadRequest {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        filename: impl Into<String>,
        upload_type: UploadType,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            filename: filename.into(),
            upload_type,
            uploader_id: ANONYMOUS_UPLOADER_ID,
            content_type: None,
            early_response: false,
        }
    }

    pub fn with_uploader(mut self, uploader_id: Uuid) -> Self {
        self.uploader_id = uploader_id;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_early_response(mut self, early_response: bool) -> Self {
        self.early_response = early_response;
        self
    }
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("filename", &self.filename)
            .field("upload_type", &self.upload_type)
            .field("uploader_id", &self.uploader_id)
            .field("content_type", &self.content_type)
            .field("early_response", &self.early_response)
            .finish_non_exhaustive()
    }
}

fn task_failed(task: &str, err: JoinError) -> AppError {
    AppError::Internal(format!("{} task failed: {}", task, err))
}

pub struct UploadPipeline {
    storage: Arc<dyn Storage>,
    converter: Arc<dyn Converter>,
    metadata_store: Arc<dyn MetadataStore>,
    config: PipelineConfig,
    builder: PipelineBuilder,
}

impl UploadPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        converter: Arc<dyn Converter>,
        metadata_store: Arc<dyn MetadataStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            builder: PipelineBuilder::new(config.preview_max_width),
            storage,
            converter,
            metadata_store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve the plan an upload would run, without reading anything
    pub fn plan(
        &self,
        upload_type: UploadType,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<Plan, AppError> {
        let mime_type = detect_mime_type(filename, content_type);
        self.builder.build(upload_type, &mime_type)
    }

    /// Store one upload and run its derivative processors.
    ///
    /// Returns the record once the canonical bytes are stored and, unless
    /// `early_response` is set, once every processor result is merged. The first
    /// fatal error recorded by any stage is returned.
    #[tracing::instrument(
        skip(self, request),
        fields(
            filename = %request.filename,
            upload_type = %request.upload_type,
            file_id = tracing::field::Empty
        )
    )]
    pub async fn upload_file(&self, request: UploadRequest) -> Result<FileRecord, AppError> {
        let UploadRequest {
            mut reader,
            filename,
            upload_type,
            uploader_id,
            content_type,
            early_response,
        } = request;

        let file_id = Uuid::new_v4();
        tracing::Span::current().record("file_id", tracing::field::display(file_id));

        let filename = sanitize_filename(&filename);
        let plan = self.plan(upload_type, &filename, content_type.as_deref())?;

        let mut record = FileRecord::new(file_id, filename, upload_type, uploader_id);
        plan.apply(&mut record);

        info!(
            mime_type = %plan.mime_type,
            category = %plan.category,
            transform = plan.transform.as_ref().map(|t| t.name()).unwrap_or("none"),
            processors = plan.processors.len(),
            "Upload accepted"
        );

        let (errors, mut error_drain) = error_channel();
        let metadata = SharedMetaData::new();
        let group = CompletionGroup::new();

        // Store branch first: its writer is always the first one fed
        let (store_writer, store_reader) = pipe();
        let mut writers = vec![store_writer];

        let (sink_reader, transform_handle) = match plan.transform.clone() {
            Some(transform) => {
                let (out_writer, out_reader) = pipe();
                let handle = spawn_transform(
                    Arc::clone(&self.converter),
                    transform,
                    store_reader,
                    out_writer,
                    errors.clone(),
                );
                (out_reader, Some(handle))
            }
            None => (store_reader, None),
        };

        let (stored_tx, stored_rx) = oneshot::channel();
        let sink_handle = spawn_sink(
            Arc::clone(&self.storage),
            Arc::clone(&self.metadata_store),
            record,
            sink_reader,
            errors.clone(),
            stored_tx,
        );

        let ctx = ProcessorContext {
            file_id,
            uploader_id,
            category: plan.category,
            converter: Arc::clone(&self.converter),
            storage: Arc::clone(&self.storage),
            metadata: metadata.clone(),
        };
        for spec in &plan.processors {
            let (writer, reader) = pipe();
            writers.push(writer);
            spawn_processor(spec.build(ctx.clone()), reader, group.guard());
        }

        let aggregator_handle = spawn_aggregator(
            Aggregator::new(Arc::clone(&self.storage), Arc::clone(&self.metadata_store)),
            group,
            metadata,
            stored_rx,
        );

        let broadcast_result = broadcast(
            &mut reader,
            MultiWriter::new(writers),
            self.config.rate_limit,
            &errors,
        )
        .await;

        let stored = sink_handle.await.map_err(|e| task_failed("store sink", e))?;
        if let Some(handle) = transform_handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Pre-save transform task failed");
            }
        }

        let record = match (error_drain.first(), stored, broadcast_result) {
            (Some(err), _, _) => Err(err),
            (None, Err(err), _) => Err(err),
            (None, Ok(_), Err(err)) => Err(err),
            (None, Ok(record), Ok(_)) => Ok(record),
        }
        .inspect_err(|err| warn!(error = %err, "Upload failed"))?;

        if early_response {
            info!(size_bytes = record.size, "Upload stored, processors continue in background");
            return Ok(record);
        }

        match aggregator_handle.await.map_err(|e| task_failed("aggregator", e))? {
            Some(merged) => {
                info!(
                    size_bytes = merged.size,
                    thumbnails = merged.thumbnails.len(),
                    "Upload complete"
                );
                Ok(merged)
            }
            // Aggregator lost the store outcome; the stored record stands
            None => Ok(record),
        }
    }
}
