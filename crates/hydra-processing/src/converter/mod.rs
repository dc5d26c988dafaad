//! Media conversion and measurement
//!
//! The `Converter` trait is the pipeline's only view of codec work. Every call
//! consumes its input to the end or fails. `MediaConverter` implements it with the
//! `image` crate for raster work and ffmpeg/ffprobe child processes for audio and video.

pub(crate) mod document;
mod media;
mod probe;
pub(crate) mod raster;

pub use media::MediaConverter;

use async_trait::async_trait;
use hydra_core::Meta;
use std::io;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::mime::MimeCategory;

/// Owned byte stream produced by a conversion
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Converted raster together with its final dimensions
pub struct Rendition {
    pub data: ByteStream,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Rendition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rendition")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Which metadata extractor to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Image,
    Video,
    Audio,
    Voice,
    Document,
    Gif,
}

impl MetaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKind::Image => "image",
            MetaKind::Video => "video",
            MetaKind::Audio => "audio",
            MetaKind::Voice => "voice",
            MetaKind::Document => "document",
            MetaKind::Gif => "gif",
        }
    }
}

/// H.264 transcode settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp4Options {
    /// Constant rate factor
    pub quality: u8,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// AAC bitrate; `None` drops the audio track
    pub audio_bitrate_kbps: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{tool} failed: {stderr}")]
    ProcessFailed { tool: String, stderr: String },

    #[error("Failed to parse probe output: {0}")]
    ProbeOutput(#[from] serde_json::Error),

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("Unsupported conversion: {0}")]
    Unsupported(String),

    #[error("Conversion task failed: {0}")]
    Task(String),
}

/// Media transform and measurement service
#[async_trait]
pub trait Converter: Send + Sync {
    /// Extract type-specific metadata
    async fn meta(
        &self,
        kind: MetaKind,
        input: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Meta, ConvertError>;

    /// Transcode to H.264/AAC in an MP4 container
    async fn to_mp4(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        options: Mp4Options,
    ) -> Result<ByteStream, ConvertError>;

    /// Transcode to MP3 with a VBR quality level (0 best, 9 smallest)
    async fn to_mp3(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        quality: u8,
    ) -> Result<ByteStream, ConvertError>;

    /// Re-encode a raster as JPEG, shrinking it to fit the given bounds
    async fn to_jpeg(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> Result<ByteStream, ConvertError>;

    /// Center-cropped JPEG thumbnail of at most `max_width` x `max_height`
    async fn thumbnail(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        category: MimeCategory,
        max_width: u32,
        max_height: u32,
    ) -> Result<Rendition, ConvertError>;

    /// Aspect-preserving JPEG that fits within the given bounds
    async fn resized(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        category: MimeCategory,
        max_width: u32,
        max_height: Option<u32>,
    ) -> Result<Rendition, ConvertError>;
}
