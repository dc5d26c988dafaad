//! Preview and square thumbnail generation

use async_trait::async_trait;
use hydra_core::constants::{DERIVATIVE_EXTENSION, DERIVATIVE_MIME_TYPE};
use hydra_core::{AppError, FileRecord, FileStatus, ThumbnailName, ThumbnailRef, UploadType};
use tokio::io::AsyncRead;
use uuid::Uuid;

use super::{Processor, ProcessorContext};
use crate::converter::Rendition;

/// Store a rendition as a derivative of the upload and register it under `name`
async fn store_rendition(
    ctx: &ProcessorContext,
    name: ThumbnailName,
    rendition: Rendition,
) -> Result<(), AppError> {
    let id = Uuid::new_v4();
    let filename = format!("{}_{}.{}", ctx.file_id, name, DERIVATIVE_EXTENSION);
    let mut record = FileRecord::new(id, filename, UploadType::Image, ctx.uploader_id);
    record.mime_type = DERIVATIVE_MIME_TYPE.to_string();
    record.status = FileStatus::Thumbnail;
    record.width = Some(rendition.width);
    record.height = Some(rendition.height);

    let mut data = rendition.data;
    let stored = ctx.storage.save(&record, &mut data).await.map_err(|e| {
        AppError::DerivativeFailure(format!("failed to store {} derivative: {}", name, e))
    })?;

    tracing::debug!(
        file_id = %ctx.file_id,
        derivative_id = %id,
        name = %name,
        size = stored.size,
        "Derivative stored"
    );

    ctx.metadata
        .register_thumbnail(
            name,
            ThumbnailRef {
                id,
                width: rendition.width,
                height: rendition.height,
                size: stored.size,
                url: stored.url,
            },
        )
        .await;
    Ok(())
}

/// Square, center-cropped thumbnail
pub struct ThumbnailGenerator {
    ctx: ProcessorContext,
    name: ThumbnailName,
    max_dimension: u32,
}

impl ThumbnailGenerator {
    pub fn new(ctx: ProcessorContext, name: ThumbnailName, max_dimension: u32) -> Self {
        Self {
            ctx,
            name,
            max_dimension,
        }
    }
}

#[async_trait]
impl Processor for ThumbnailGenerator {
    fn name(&self) -> String {
        format!("thumbnail_{}", self.name)
    }

    async fn process(&self, input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<(), AppError> {
        let rendition = self
            .ctx
            .converter
            .thumbnail(input, self.ctx.category, self.max_dimension, self.max_dimension)
            .await
            .map_err(|e| AppError::DerivativeFailure(format!("{}: {}", self.name(), e)))?;
        store_rendition(&self.ctx, self.name, rendition).await
    }
}

/// Aspect-preserving preview bounded by width
pub struct PreviewGenerator {
    ctx: ProcessorContext,
    max_width: u32,
}

impl PreviewGenerator {
    pub fn new(ctx: ProcessorContext, max_width: u32) -> Self {
        Self { ctx, max_width }
    }
}

#[async_trait]
impl Processor for PreviewGenerator {
    fn name(&self) -> String {
        "preview".to_string()
    }

    async fn process(&self, input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<(), AppError> {
        let rendition = self
            .ctx
            .converter
            .resized(input, self.ctx.category, self.max_width, None)
            .await
            .map_err(|e| AppError::DerivativeFailure(format!("preview: {}", e)))?;
        store_rendition(&self.ctx, ThumbnailName::Preview, rendition).await
    }
}
