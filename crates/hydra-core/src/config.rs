//! Configuration module
//!
//! This module provides the configuration for the upload pipeline: storage backend
//! selection, converter executables, ingestion rate limits and logging format.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const UPLOAD_RATE_LIMIT_BYTES: usize = 4 * 1024 * 1024;
const UPLOAD_RATE_TICK_MS: u64 = 1000;
const UPLOAD_CHUNK_SIZE_BYTES: usize = 64 * 1024;
const PREVIEW_MAX_WIDTH: u32 = 1024;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Upload pipeline configuration
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub environment: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Converter executables
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    // Ingestion
    pub upload_rate_limit_bytes: usize,
    pub upload_rate_tick_ms: u64,
    pub upload_chunk_size_bytes: usize,
    pub preview_max_width: u32,
    pub log_format: LogFormat,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<UploadConfig>);

impl Config {
    fn as_upload(&self) -> &UploadConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_upload().environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = UploadConfig::from_lookup(lookup)?;
        config.validate()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_upload().validate()
    }

    pub fn environment(&self) -> &str {
        &self.as_upload().environment
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_upload().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_upload().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_upload().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_upload().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_upload().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> &str {
        &self.as_upload().local_storage_path
    }

    pub fn local_storage_base_url(&self) -> &str {
        &self.as_upload().local_storage_base_url
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.as_upload().ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.as_upload().ffprobe_path
    }

    pub fn upload_rate_limit_bytes(&self) -> usize {
        self.as_upload().upload_rate_limit_bytes
    }

    pub fn upload_rate_tick_ms(&self) -> u64 {
        self.as_upload().upload_rate_tick_ms
    }

    pub fn upload_chunk_size_bytes(&self) -> usize {
        self.as_upload().upload_chunk_size_bytes
    }

    pub fn preview_max_width(&self) -> u32 {
        self.as_upload().preview_max_width
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_upload().log_format
    }
}

/// Parse an optional variable, falling back to `default` only when it is unset
fn parse_var<T>(value: Option<String>, key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

impl UploadConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .parse::<StorageBackend>()?;

        let log_format = lookup("LOG_FORMAT")
            .map(|s| s.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(UploadConfig {
            environment,
            storage_backend,
            s3_bucket: lookup("S3_BUCKET"),
            s3_region: lookup("S3_REGION"),
            s3_endpoint: lookup("S3_ENDPOINT"),
            aws_region: lookup("AWS_REGION"),
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| "./data".to_string()),
            local_storage_base_url: lookup("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000/files".to_string()),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: lookup("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            upload_rate_limit_bytes: parse_var(
                lookup("UPLOAD_RATE_LIMIT_BYTES"),
                "UPLOAD_RATE_LIMIT_BYTES",
                UPLOAD_RATE_LIMIT_BYTES,
            )?,
            upload_rate_tick_ms: parse_var(
                lookup("UPLOAD_RATE_TICK_MS"),
                "UPLOAD_RATE_TICK_MS",
                UPLOAD_RATE_TICK_MS,
            )?,
            upload_chunk_size_bytes: parse_var(
                lookup("UPLOAD_CHUNK_SIZE_BYTES"),
                "UPLOAD_CHUNK_SIZE_BYTES",
                UPLOAD_CHUNK_SIZE_BYTES,
            )?,
            preview_max_width: parse_var(
                lookup("PREVIEW_MAX_WIDTH"),
                "PREVIEW_MAX_WIDTH",
                PREVIEW_MAX_WIDTH,
            )?,
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_rate_limit_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_RATE_LIMIT_BYTES must be greater than 0"));
        }
        if self.upload_rate_tick_ms == 0 {
            return Err(anyhow::anyhow!("UPLOAD_RATE_TICK_MS must be greater than 0"));
        }
        if self.upload_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_CHUNK_SIZE_BYTES must be greater than 0"));
        }
        if self.preview_max_width == 0 {
            return Err(anyhow::anyhow!("PREVIEW_MAX_WIDTH must be greater than 0"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when STORAGE_BACKEND=s3"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must not be empty when STORAGE_BACKEND=local"
                    ));
                }
            }
        }

        Ok(())
    }
}
