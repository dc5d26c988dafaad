//! Per-upload processing plan
//!
//! `PipelineBuilder` maps a declared upload type and the detected MIME category to
//! the processors that run, the optional pre-save transcode and the output naming.
//! A mismatch between the two is rejected before any byte of the upload is read.

use hydra_core::{AppError, FileRecord, FileStatus, ThumbnailName, UploadType};

use crate::converter::{MetaKind, Mp4Options};
use crate::mime::MimeCategory;
use crate::processor::ProcessorSpec;

/// Transcode applied to the canonical bytes before they reach storage
#[derive(Debug, Clone, PartialEq)]
pub enum PreSaveTransform {
    ToMp4(Mp4Options),
    ToMp3 { quality: u8 },
    ToJpeg { max_width: Option<u32>, max_height: Option<u32> },
}

impl PreSaveTransform {
    /// Output naming once the transform has run
    pub fn output(&self) -> OutputFormat {
        match self {
            PreSaveTransform::ToMp4(_) => OutputFormat {
                extension: "mp4",
                mime_type: "video/mp4",
            },
            PreSaveTransform::ToMp3 { .. } => OutputFormat {
                extension: "mp3",
                mime_type: "audio/mpeg",
            },
            PreSaveTransform::ToJpeg { .. } => OutputFormat {
                extension: "jpg",
                mime_type: "image/jpeg",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PreSaveTransform::ToMp4(_) => "to_mp4",
            PreSaveTransform::ToMp3 { .. } => "to_mp3",
            PreSaveTransform::ToJpeg { .. } => "to_jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub extension: &'static str,
    pub mime_type: &'static str,
}

/// Everything the orchestrator needs to wire one upload
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub upload_type: UploadType,
    pub mime_type: String,
    pub category: MimeCategory,
    pub transform: Option<PreSaveTransform>,
    pub processors: Vec<ProcessorSpec>,
    pub status: FileStatus,
}

impl Plan {
    pub fn output(&self) -> Option<OutputFormat> {
        self.transform.as_ref().map(PreSaveTransform::output)
    }

    /// Apply MIME type, status and output naming to the baseline record
    pub fn apply(&self, record: &mut FileRecord) {
        record.mime_type = self.mime_type.clone();
        record.status = self.status;
        if let Some(output) = self.output() {
            record.mime_type = output.mime_type.to_string();
            record.set_extension(output.extension);
        }
    }
}

/// Builds a `Plan` from the policy table
#[derive(Debug, Clone, Copy)]
pub struct PipelineBuilder {
    preview_max_width: u32,
}

impl PipelineBuilder {
    pub fn new(preview_max_width: u32) -> Self {
        Self { preview_max_width }
    }

    /// Resolve the plan for an upload, or `InvalidInput` when the MIME type does not
    /// satisfy the declared upload type.
    pub fn build(&self, upload_type: UploadType, mime_type: &str) -> Result<Plan, AppError> {
        let category = MimeCategory::from_mime(mime_type);

        let required = match upload_type {
            UploadType::File => None,
            UploadType::PlacePicture | UploadType::ProfilePicture | UploadType::Image => {
                Some(MimeCategory::Image)
            }
            UploadType::Video => Some(MimeCategory::Video),
            UploadType::Audio | UploadType::Voice => Some(MimeCategory::Audio),
            UploadType::Gif => Some(MimeCategory::Gif),
        };
        if let Some(required) = required {
            if required != category {
                return Err(AppError::InvalidInput(format!(
                    "mime_type {} ({}) does not match upload_type {} (requires {})",
                    mime_type, category, upload_type, required
                )));
            }
        }

        let (transform, processors) = match upload_type {
            UploadType::File => (None, self.file_processors(category)),
            UploadType::PlacePicture | UploadType::ProfilePicture => (None, self.derivatives()),
            UploadType::Video => (
                Some(PreSaveTransform::ToMp4(Mp4Options {
                    quality: 23,
                    max_width: None,
                    max_height: Some(720),
                    audio_bitrate_kbps: Some(128),
                })),
                self.with_reader(MetaKind::Video),
            ),
            UploadType::Audio => (
                Some(PreSaveTransform::ToMp3 { quality: 3 }),
                self.with_reader(MetaKind::Audio),
            ),
            UploadType::Voice => (
                Some(PreSaveTransform::ToMp3 { quality: 9 }),
                vec![ProcessorSpec::MetaReader(MetaKind::Voice)],
            ),
            UploadType::Image => (
                Some(PreSaveTransform::ToJpeg {
                    max_width: Some(1200),
                    max_height: None,
                }),
                self.with_reader(MetaKind::Image),
            ),
            UploadType::Gif => (
                Some(PreSaveTransform::ToMp4(Mp4Options {
                    quality: 23,
                    max_width: None,
                    max_height: None,
                    audio_bitrate_kbps: None,
                })),
                self.with_reader(MetaKind::Gif),
            ),
        };

        let status = match upload_type {
            UploadType::PlacePicture | UploadType::ProfilePicture => FileStatus::Public,
            _ => FileStatus::Temp,
        };

        Ok(Plan {
            upload_type,
            mime_type: mime_type.to_string(),
            category,
            transform,
            processors,
            status,
        })
    }

    /// Preview followed by the three square thumbnails
    fn derivatives(&self) -> Vec<ProcessorSpec> {
        let mut specs = vec![ProcessorSpec::Preview {
            max_width: self.preview_max_width,
        }];
        specs.extend(
            [
                ThumbnailName::Size32,
                ThumbnailName::Size64,
                ThumbnailName::Size128,
            ]
            .into_iter()
            .filter_map(|name| {
                name.max_dimension()
                    .map(|max_dimension| ProcessorSpec::Thumbnail {
                        name,
                        max_dimension,
                    })
            }),
        );
        specs
    }

    /// Metadata reader first, then derivatives
    fn with_reader(&self, kind: MetaKind) -> Vec<ProcessorSpec> {
        let mut specs = vec![ProcessorSpec::MetaReader(kind)];
        specs.extend(self.derivatives());
        specs
    }

    /// Generic files: derivatives first, then the metadata reader for the subtype
    fn file_processors(&self, category: MimeCategory) -> Vec<ProcessorSpec> {
        let kind = match category {
            MimeCategory::Image => MetaKind::Image,
            MimeCategory::Gif => MetaKind::Gif,
            MimeCategory::Video => MetaKind::Video,
            MimeCategory::Audio => MetaKind::Audio,
            MimeCategory::Document => return vec![ProcessorSpec::MetaReader(MetaKind::Document)],
            MimeCategory::Other => return Vec::new(),
        };
        let mut specs = self.derivatives();
        specs.push(ProcessorSpec::MetaReader(kind));
        specs
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new(1024)
    }
}
