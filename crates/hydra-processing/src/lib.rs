//! Hydra Processing Library
//!
//! This crate implements the upload pipeline: one inbound byte stream is rate limited
//! and broadcast to a store sink plus zero or more derivative processors, with an
//! optional transcode in front of the store. Results are merged into one record.
//!
//! Failures split in two: the store sink and the pre-save transform are fatal to an
//! upload, processors are best-effort and only logged.

pub mod aggregator;
pub mod completion;
pub mod converter;
pub mod fanout;
pub mod metadata;
pub mod mime;
pub mod orchestrator;
pub mod pipe;
pub mod plan;
pub mod processor;
pub mod sink;
pub mod transform;

// Re-export commonly used types
pub use completion::{CompletionGroup, CompletionGuard};
pub use converter::{
    ByteStream, ConvertError, Converter, MediaConverter, MetaKind, Mp4Options, Rendition,
};
pub use fanout::{broadcast, error_channel, ErrorDrain, ErrorSink, RateLimit};
pub use metadata::{MetaData, SharedMetaData};
pub use mime::{detect_mime_type, sanitize_filename, MimeCategory};
pub use orchestrator::{PipelineConfig, UploadPipeline, UploadRequest};
pub use pipe::{drain, pipe, MultiWriter, PipeReader, PipeWriter};
pub use plan::{OutputFormat, PipelineBuilder, Plan, PreSaveTransform};
pub use processor::{Processor, ProcessorContext, ProcessorSpec};
