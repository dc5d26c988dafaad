use async_trait::async_trait;
use hydra_core::AppError;
use tokio::io::AsyncRead;

use super::{Processor, ProcessorContext};
use crate::converter::MetaKind;

/// Extracts type-specific metadata into the upload's aggregate
pub struct MetaReader {
    ctx: ProcessorContext,
    kind: MetaKind,
}

impl MetaReader {
    pub fn new(ctx: ProcessorContext, kind: MetaKind) -> Self {
        Self { ctx, kind }
    }
}

#[async_trait]
impl Processor for MetaReader {
    fn name(&self) -> String {
        format!("{}_meta", self.kind.as_str())
    }

    async fn process(&self, input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<(), AppError> {
        let meta = self
            .ctx
            .converter
            .meta(self.kind, input)
            .await
            .map_err(|e| AppError::DerivativeFailure(format!("{}: {}", self.name(), e)))?;

        tracing::debug!(file_id = %self.ctx.file_id, kind = meta.kind(), "Metadata extracted");
        self.ctx.metadata.set_meta(meta).await;
        Ok(())
    }
}
