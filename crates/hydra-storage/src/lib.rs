//! Hydra Storage Library
//!
//! This crate provides the content-addressed storage abstraction used by the upload
//! pipeline, with implementations for S3 and the local filesystem.
//!
//! # Storage key format
//!
//! Every stored file is addressed by its universal ID. All backends share one layout:
//!
//! - **Blob**: `files/{id[0..2]}/{id}`
//! - **Metadata sidecar**: `files/{id[0..2]}/{id}.meta.json`
//! - **Thumbnail sidecar**: `files/{id[0..2]}/{id}.thumbnails.json`
//!
//! Key generation is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use hydra_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredFile};
