//! Scriptable `Converter` for pipeline tests.

use async_trait::async_trait;
use hydra_core::{ImageMeta, Meta};
use hydra_processing::{
    ByteStream, ConvertError, Converter, MetaKind, MimeCategory, Mp4Options, Rendition,
};
use std::io::Cursor;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// What the pre-save transforms return
#[derive(Debug, Clone)]
pub enum TransformOutput {
    /// The input bytes, unchanged
    Echo,
    Fixed(Vec<u8>),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct FakeConverter {
    pub meta: Meta,
    pub transform: TransformOutput,
    /// Thumbnail bound that fails instead of rendering
    pub failing_thumbnail: Option<u32>,
    /// Time each derivative takes after its input is consumed
    pub processor_delay: Duration,
}

impl Default for FakeConverter {
    fn default() -> Self {
        Self {
            meta: Meta::Image(ImageMeta {
                width: 640,
                height: 480,
                format: Some("png".to_string()),
            }),
            transform: TransformOutput::Echo,
            failing_thumbnail: None,
            processor_delay: Duration::ZERO,
        }
    }
}

impl FakeConverter {
    async fn consume(input: &mut (dyn AsyncRead + Send + Unpin)) -> Result<Vec<u8>, ConvertError> {
        let mut data = Vec::new();
        input.read_to_end(&mut data).await?;
        Ok(data)
    }

    async fn transcode(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<ByteStream, ConvertError> {
        let data = Self::consume(input).await?;
        match &self.transform {
            TransformOutput::Echo => Ok(Box::pin(Cursor::new(data))),
            TransformOutput::Fixed(bytes) => Ok(Box::pin(Cursor::new(bytes.clone()))),
            TransformOutput::Fail(message) => Err(ConvertError::InvalidMedia(message.clone())),
        }
    }

    async fn render(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        width: u32,
        height: u32,
    ) -> Result<Rendition, ConvertError> {
        Self::consume(input).await?;
        if !self.processor_delay.is_zero() {
            tokio::time::sleep(self.processor_delay).await;
        }
        if self.failing_thumbnail == Some(width) {
            return Err(ConvertError::InvalidMedia(format!("cannot render {}px", width)));
        }
        let data = vec![0xFF, 0xD8, 0xFF, 0xE0, width as u8, height as u8];
        Ok(Rendition {
            data: Box::pin(Cursor::new(data)),
            width,
            height,
        })
    }
}

#[async_trait]
impl Converter for FakeConverter {
    async fn meta(
        &self,
        _kind: MetaKind,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Meta, ConvertError> {
        Self::consume(input).await?;
        if !self.processor_delay.is_zero() {
            tokio::time::sleep(self.processor_delay).await;
        }
        Ok(self.meta.clone())
    }

    async fn to_mp4(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        _options: Mp4Options,
    ) -> Result<ByteStream, ConvertError> {
        self.transcode(input).await
    }

    async fn to_mp3(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        _quality: u8,
    ) -> Result<ByteStream, ConvertError> {
        self.transcode(input).await
    }

    async fn to_jpeg(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        _max_width: Option<u32>,
        _max_height: Option<u32>,
    ) -> Result<ByteStream, ConvertError> {
        self.transcode(input).await
    }

    async fn thumbnail(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        _category: MimeCategory,
        max_width: u32,
        max_height: u32,
    ) -> Result<Rendition, ConvertError> {
        self.render(input, max_width, max_height).await
    }

    async fn resized(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        _category: MimeCategory,
        max_width: u32,
        max_height: Option<u32>,
    ) -> Result<Rendition, ConvertError> {
        let height = max_height.unwrap_or(max_width * 3 / 4);
        self.render(input, max_width, height).await
    }
}
