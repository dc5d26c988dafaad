use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of derivative names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbnailName {
    #[serde(rename = "32")]
    Size32,
    #[serde(rename = "64")]
    Size64,
    #[serde(rename = "128")]
    Size128,
    #[serde(rename = "preview")]
    Preview,
}

impl ThumbnailName {
    pub const ALL: [ThumbnailName; 4] = [
        ThumbnailName::Size32,
        ThumbnailName::Size64,
        ThumbnailName::Size128,
        ThumbnailName::Preview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailName::Size32 => "32",
            ThumbnailName::Size64 => "64",
            ThumbnailName::Size128 => "128",
            ThumbnailName::Preview => "preview",
        }
    }

    /// Square bound of the fixed-size thumbnails; previews have none.
    pub fn max_dimension(&self) -> Option<u32> {
        match self {
            ThumbnailName::Size32 => Some(32),
            ThumbnailName::Size64 => Some(64),
            ThumbnailName::Size128 => Some(128),
            ThumbnailName::Preview => None,
        }
    }
}

impl Display for ThumbnailName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Reference to a stored derivative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRef {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub url: String,
}

/// Per-name derivative references. Names outside the fixed set are unrepresentable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(rename = "32", default, skip_serializing_if = "Option::is_none")]
    pub size_32: Option<ThumbnailRef>,
    #[serde(rename = "64", default, skip_serializing_if = "Option::is_none")]
    pub size_64: Option<ThumbnailRef>,
    #[serde(rename = "128", default, skip_serializing_if = "Option::is_none")]
    pub size_128: Option<ThumbnailRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ThumbnailRef>,
}

impl Thumbnails {
    fn slot_mut(&mut self, name: ThumbnailName) -> &mut Option<ThumbnailRef> {
        match name {
            ThumbnailName::Size32 => &mut self.size_32,
            ThumbnailName::Size64 => &mut self.size_64,
            ThumbnailName::Size128 => &mut self.size_128,
            ThumbnailName::Preview => &mut self.preview,
        }
    }

    /// Register a derivative, returning the one it replaced.
    pub fn insert(&mut self, name: ThumbnailName, thumbnail: ThumbnailRef) -> Option<ThumbnailRef> {
        self.slot_mut(name).replace(thumbnail)
    }

    pub fn get(&self, name: ThumbnailName) -> Option<&ThumbnailRef> {
        match name {
            ThumbnailName::Size32 => self.size_32.as_ref(),
            ThumbnailName::Size64 => self.size_64.as_ref(),
            ThumbnailName::Size128 => self.size_128.as_ref(),
            ThumbnailName::Preview => self.preview.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThumbnailName, &ThumbnailRef)> + '_ {
        ThumbnailName::ALL
            .into_iter()
            .filter_map(move |name| self.get(name).map(|t| (name, t)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
