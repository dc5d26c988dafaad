//! MIME type detection and categorization
//!
//! Detection never reads the stream: it uses the declared content type when it is
//! recognized, otherwise the filename extension.

use hydra_core::constants::DEFAULT_MIME_TYPE;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Coarse media category that drives processor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeCategory {
    Image,
    Gif,
    Video,
    Audio,
    Document,
    Other,
}

impl MimeCategory {
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = essence(mime_type);
        match essence.as_str() {
            "image/gif" => MimeCategory::Gif,
            "image/jpeg" | "image/png" | "image/webp" => MimeCategory::Image,
            "application/pdf" => MimeCategory::Document,
            "application/ogg" => MimeCategory::Audio,
            other if other.starts_with("video/") => MimeCategory::Video,
            other if other.starts_with("audio/") => MimeCategory::Audio,
            _ => MimeCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeCategory::Image => "image",
            MimeCategory::Gif => "gif",
            MimeCategory::Video => "video",
            MimeCategory::Audio => "audio",
            MimeCategory::Document => "document",
            MimeCategory::Other => "other",
        }
    }
}

impl Display for MimeCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Lowercased MIME type without parameters
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Canonical MIME type for a filename extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        // Documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Detect the MIME type of an upload from its declared content type and filename
pub fn detect_mime_type(filename: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared {
        let declared = essence(declared);
        if !declared.is_empty() && declared != DEFAULT_MIME_TYPE && declared.contains('/') {
            return declared;
        }
    }

    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Reduce a client-supplied filename to a safe base name
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() || s.len() < 3 {
        "file".to_string()
    } else {
        s
    }
}
