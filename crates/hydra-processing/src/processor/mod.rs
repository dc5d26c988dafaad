//! Derivative processors
//!
//! Each processor reads its own copy of the upload stream and registers its result
//! in the upload's `SharedMetaData`. Processor failures are logged and never change
//! the outcome of the upload.

mod meta_reader;
mod thumbnail;

pub use meta_reader::MetaReader;
pub use thumbnail::{PreviewGenerator, ThumbnailGenerator};

use async_trait::async_trait;
use futures::FutureExt;
use hydra_core::{AppError, ThumbnailName};
use hydra_storage::Storage;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::completion::CompletionGuard;
use crate::converter::{Converter, MetaKind};
use crate::metadata::SharedMetaData;
use crate::mime::MimeCategory;
use crate::pipe::{drain, PipeReader};

/// What a planned processor does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorSpec {
    /// Aspect-preserving preview bounded by width
    Preview { max_width: u32 },
    /// Square thumbnail
    Thumbnail {
        name: ThumbnailName,
        max_dimension: u32,
    },
    /// Type-specific metadata extraction
    MetaReader(MetaKind),
}

impl ProcessorSpec {
    pub fn build(&self, ctx: ProcessorContext) -> Box<dyn Processor> {
        match *self {
            ProcessorSpec::Preview { max_width } => Box::new(PreviewGenerator::new(ctx, max_width)),
            ProcessorSpec::Thumbnail {
                name,
                max_dimension,
            } => Box::new(ThumbnailGenerator::new(ctx, name, max_dimension)),
            ProcessorSpec::MetaReader(kind) => Box::new(MetaReader::new(ctx, kind)),
        }
    }
}

/// Collaborators shared by the processors of one upload
#[derive(Clone)]
pub struct ProcessorContext {
    pub file_id: Uuid,
    pub uploader_id: Uuid,
    pub category: MimeCategory,
    pub converter: Arc<dyn Converter>,
    pub storage: Arc<dyn Storage>,
    pub metadata: SharedMetaData,
}

#[async_trait]
pub trait Processor: Send + Sync {
    fn name(&self) -> String;

    /// Consume `input` and register the result
    async fn process(&self, input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<(), AppError>;
}

/// Run `processor` on its own task.
///
/// The reader is drained afterwards whatever the outcome, so a failed processor
/// never stalls the broadcast. `guard` is released last.
pub fn spawn_processor(
    processor: Box<dyn Processor>,
    mut reader: PipeReader,
    guard: CompletionGuard,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _guard = guard;
        let name = processor.name();

        match AssertUnwindSafe(processor.process(&mut reader))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => debug!(processor = %name, "Processor finished"),
            Ok(Err(err)) => warn!(processor = %name, error = %err, "Processor failed"),
            Err(_) => warn!(processor = %name, "Processor panicked"),
        }

        if let Err(err) = drain(&mut reader).await {
            debug!(processor = %name, error = %err, "Upload stream ended with error");
        }
    })
}
