//! Data models for the upload pipeline
//!
//! Each sub-module covers one part of the per-upload record: the canonical file
//! record, the declared upload type, type-specific metadata and thumbnails.

mod file;
mod meta;
mod thumbnail;
mod upload_type;

pub use file::*;
pub use meta::*;
pub use thumbnail::*;
pub use upload_type::*;
