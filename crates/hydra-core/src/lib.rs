//! Hydra Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every Hydra component: the upload record, its type-specific metadata, the
//! thumbnail set and the metadata-store collaborator interface.

pub mod config;
pub mod constants;
pub mod error;
pub mod metadata_store;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use metadata_store::{InMemoryMetadataStore, MetadataStore, NoOpMetadataStore};
pub use models::{
    AudioMeta, FileRecord, FileStatus, GifMeta, ImageMeta, Meta, PdfMeta, ThumbnailName,
    ThumbnailRef, Thumbnails, UploadType, VideoMeta,
};
pub use storage_types::StorageBackend;
