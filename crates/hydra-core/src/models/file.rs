use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::thumbnail::Thumbnails;
use super::upload_type::UploadType;

/// Lifecycle status of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Uploaded but not yet attached to any owner.
    Temp,
    /// Readable by anyone (profile and place pictures).
    Public,
    /// Referenced by another record.
    Attached,
    /// Generated derivative of another file.
    Thumbnail,
}

/// Canonical record of one stored file.
///
/// The ID is allocated before any byte of the upload is read and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub upload_type: UploadType,
    pub mime_type: String,
    pub size: u64,
    pub status: FileStatus,
    pub uploader_id: Uuid,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Thumbnails::is_empty")]
    pub thumbnails: Thumbnails,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Baseline record for a new upload, in `Temp` status with no size yet.
    pub fn new(
        id: Uuid,
        filename: impl Into<String>,
        upload_type: UploadType,
        uploader_id: Uuid,
    ) -> Self {
        FileRecord {
            id,
            filename: filename.into(),
            upload_type,
            mime_type: String::new(),
            size: 0,
            status: FileStatus::Temp,
            uploader_id,
            width: None,
            height: None,
            thumbnails: Thumbnails::default(),
            created_at: Utc::now(),
        }
    }

    /// Filename extension, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Replace (or append) the filename extension.
    pub fn set_extension(&mut self, extension: &str) {
        let stem = std::path::Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("file")
            .to_string();
        self.filename = format!("{}.{}", stem, extension);
    }
}
