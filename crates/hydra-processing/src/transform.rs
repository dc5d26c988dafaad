//! Pre-save transcode
//!
//! Sits between the store branch of the broadcast and the store sink. The converted
//! stream replaces the original bytes in storage; processors keep reading the
//! original. Any failure here is fatal to the upload.

use bytes::Bytes;
use hydra_core::AppError;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::converter::Converter;
use crate::fanout::ErrorSink;
use crate::pipe::{drain, PipeReader, PipeWriter};
use crate::plan::PreSaveTransform;

const COPY_CHUNK_SIZE: usize = 64 * 1024;

enum TransformError {
    Convert(String),
    Empty,
    Output(io::Error),
}

impl TransformError {
    fn to_app_error(&self, transform: &str) -> AppError {
        match self {
            TransformError::Convert(message) => {
                AppError::TransformFailure(format!("{} failed: {}", transform, message))
            }
            TransformError::Empty => {
                AppError::TransformFailure(format!("{} produced no output", transform))
            }
            TransformError::Output(err) => {
                AppError::StorageFailure(format!("store rejected {} output: {}", transform, err))
            }
        }
    }
}

async fn convert(
    converter: &dyn Converter,
    transform: &PreSaveTransform,
    input: &mut PipeReader,
    output: &mut PipeWriter,
) -> Result<u64, TransformError> {
    let converted = match *transform {
        PreSaveTransform::ToMp4(options) => converter.to_mp4(input, options).await,
        PreSaveTransform::ToMp3 { quality } => converter.to_mp3(input, quality).await,
        PreSaveTransform::ToJpeg {
            max_width,
            max_height,
        } => converter.to_jpeg(input, max_width, max_height).await,
    };
    let mut converted = converted.map_err(|e| TransformError::Convert(e.to_string()))?;

    // Whatever the converter left unread must not hold up the broadcast
    drain(input)
        .await
        .map_err(|e| TransformError::Convert(e.to_string()))?;

    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut total: u64 = 0;
    loop {
        let n = converted
            .read(&mut buf)
            .await
            .map_err(|e| TransformError::Convert(e.to_string()))?;
        if n == 0 {
            break;
        }
        output
            .write(Bytes::copy_from_slice(&buf[..n]))
            .await
            .map_err(TransformError::Output)?;
        total += n as u64;
    }

    if total == 0 {
        return Err(TransformError::Empty);
    }
    Ok(total)
}

/// Run `transform` from `input` into `output` on its own task.
///
/// On failure the error is pushed to `errors` before either pipe is closed with it,
/// so it wins over the failures it causes downstream.
pub fn spawn_transform(
    converter: Arc<dyn Converter>,
    transform: PreSaveTransform,
    mut input: PipeReader,
    mut output: PipeWriter,
    errors: ErrorSink,
) -> JoinHandle<Result<u64, AppError>> {
    tokio::spawn(async move {
        let name = transform.name();
        match convert(converter.as_ref(), &transform, &mut input, &mut output).await {
            Ok(size) => {
                output.close();
                info!(transform = name, size_bytes = size, "Pre-save transform complete");
                Ok(size)
            }
            Err(err) => {
                let app_error = err.to_app_error(name);
                warn!(transform = name, error = %app_error, "Pre-save transform failed");
                errors.push(err.to_app_error(name));

                let io_err = io::Error::new(io::ErrorKind::Other, app_error.to_string());
                input.close_with_error(&io_err);
                output.close_with_error(&io_err);
                Err(app_error)
            }
        }
    })
}
