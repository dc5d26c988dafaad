use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

/// Shared by audio and voice uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMeta {
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfMeta {
    pub page_count: u32,
    /// First page MediaBox width in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GifMeta {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub duration_ms: u64,
}

/// Type-specific metadata of an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Meta {
    Image(ImageMeta),
    Video(VideoMeta),
    Audio(AudioMeta),
    Voice(AudioMeta),
    Pdf(PdfMeta),
    Gif(GifMeta),
}

impl Meta {
    /// Width and height for variants that carry them. Audio and voice never do.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Meta::Image(m) => Some((m.width, m.height)),
            Meta::Video(m) => Some((m.width, m.height)),
            Meta::Gif(m) => Some((m.width, m.height)),
            Meta::Pdf(m) => m.width.zip(m.height),
            Meta::Audio(_) | Meta::Voice(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Meta::Image(_) => "image",
            Meta::Video(_) => "video",
            Meta::Audio(_) => "audio",
            Meta::Voice(_) => "voice",
            Meta::Pdf(_) => "pdf",
            Meta::Gif(_) => "gif",
        }
    }
}
