use hydra_core::LogFormat;
use std::path::Path;
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "hydra_processing=debug,hydra_storage=info,hydra_cli=info";

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout carries only the
/// resulting record.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(
                        Format::default()
                            .compact()
                            .with_target(false)
                            .without_time(),
                    )
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Filename to record for an uploaded path
pub fn upload_filename(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}
