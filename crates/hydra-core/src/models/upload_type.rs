use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upload type declared by the caller alongside the file part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadType {
    File,
    PlacePicture,
    ProfilePicture,
    Video,
    Audio,
    Voice,
    Image,
    Gif,
}

impl UploadType {
    pub const ALL: [UploadType; 8] = [
        UploadType::File,
        UploadType::PlacePicture,
        UploadType::ProfilePicture,
        UploadType::Video,
        UploadType::Audio,
        UploadType::Voice,
        UploadType::Image,
        UploadType::Gif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadType::File => "FILE",
            UploadType::PlacePicture => "PLACE_PICTURE",
            UploadType::ProfilePicture => "PROFILE_PICTURE",
            UploadType::Video => "VIDEO",
            UploadType::Audio => "AUDIO",
            UploadType::Voice => "VOICE",
            UploadType::Image => "IMAGE",
            UploadType::Gif => "GIF",
        }
    }
}

impl FromStr for UploadType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        UploadType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| AppError::InvalidInput(format!("upload_type '{}' is not supported", s)))
    }
}

impl Display for UploadType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
