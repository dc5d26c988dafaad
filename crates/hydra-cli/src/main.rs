//! hydra-upload: run one local file through the upload pipeline.
//!
//! Storage and tool paths come from the environment (see `Config::from_env`). The
//! resulting record is printed to stdout as JSON.

use anyhow::Context;
use clap::Parser;
use hydra_cli::{init_tracing, upload_filename};
use hydra_core::{Config, InMemoryMetadataStore, UploadType};
use hydra_processing::{MediaConverter, PipelineConfig, UploadPipeline, UploadRequest};
use hydra_storage::create_storage;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hydra-upload", about = "Store a file and generate its derivatives")]
struct Cli {
    /// Path to the file to upload
    file: PathBuf,
    /// Upload type: FILE, PLACE_PICTURE, PROFILE_PICTURE, VIDEO, AUDIO, VOICE, IMAGE, GIF
    #[arg(long = "type", default_value = "FILE")]
    upload_type: UploadType,
    /// Uploader UUID
    #[arg(long)]
    uploader: Option<Uuid>,
    /// Content type declared for the file; detected from the extension when absent
    #[arg(long)]
    content_type: Option<String>,
    /// Print the record as soon as it is stored. Derivatives still running are
    /// abandoned when the process exits.
    #[arg(long)]
    early_response: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format());
    tracing::debug!(
        environment = config.environment(),
        storage_backend = %config.storage_backend(),
        "Configuration loaded"
    );

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let pipeline = UploadPipeline::new(
        storage,
        Arc::new(MediaConverter::from_config(&config)),
        Arc::new(InMemoryMetadataStore::new()),
        PipelineConfig::from(&config),
    );

    let file = tokio::fs::File::open(&cli.file)
        .await
        .with_context(|| format!("Failed to open {}", cli.file.display()))?;

    let mut request = UploadRequest::new(file, upload_filename(&cli.file), cli.upload_type)
        .with_early_response(cli.early_response);
    if let Some(uploader) = cli.uploader {
        request = request.with_uploader(uploader);
    }
    if let Some(content_type) = cli.content_type {
        request = request.with_content_type(content_type);
    }

    let record = pipeline.upload_file(request).await.context("Upload failed")?;
    tracing::info!(
        file_id = %record.id,
        size = record.size,
        thumbnails = record.thumbnails.len(),
        "Upload complete"
    );

    let out = serde_json::to_string_pretty(&record).context("Serialize record")?;
    println!("{}", out);
    Ok(())
}
