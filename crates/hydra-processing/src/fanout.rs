//! Rate-limited broadcast of the inbound stream
//!
//! Once per tick the driver copies up to a quota of bytes from the source into a
//! `MultiWriter`, which hands every chunk to each consumer pipe in turn. The loop
//! ends at end of stream or on the first read or write error. Every writer is then
//! closed, with the error when there was one.

use bytes::Bytes;
use hydra_core::AppError;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::pipe::MultiWriter;

/// Errors kept per upload. The first ones pushed win; later ones are dropped.
const ERROR_CHANNEL_CAPACITY: usize = 2;

/// Ingestion throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Bytes copied per tick
    pub quota_bytes: usize,
    pub tick: Duration,
    /// Largest chunk handed to the consumers in one write
    pub chunk_size: usize,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            quota_bytes: 4 * 1024 * 1024,
            tick: Duration::from_secs(1),
            chunk_size: 64 * 1024,
        }
    }
}

/// Non-blocking producer side of the per-upload error channel
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<AppError>,
}

impl ErrorSink {
    /// Record an error without waiting. Dropped when the channel is already full.
    pub fn push(&self, err: AppError) {
        match self.tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                tracing::debug!(error = %err, "Error channel full, dropping error");
            }
            Err(TrySendError::Closed(err)) => {
                tracing::debug!(error = %err, "Error channel closed, dropping error");
            }
        }
    }
}

/// Consumer side of the per-upload error channel
#[derive(Debug)]
pub struct ErrorDrain {
    rx: mpsc::Receiver<AppError>,
}

impl ErrorDrain {
    /// First error recorded so far, without waiting
    pub fn first(&mut self) -> Option<AppError> {
        self.rx.try_recv().ok()
    }
}

pub fn error_channel() -> (ErrorSink, ErrorDrain) {
    let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
    (ErrorSink { tx }, ErrorDrain { rx })
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

/// Copy up to `quota` bytes, returning how many were copied. Fewer than `quota`
/// means the source reached end of stream.
async fn copy_quota<R>(
    source: &mut R,
    writers: &mut MultiWriter,
    quota: usize,
    buf: &mut [u8],
) -> Result<usize, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut copied = 0;
    while copied < quota {
        let want = buf.len().min(quota - copied);
        let n = source
            .read(&mut buf[..want])
            .await
            .map_err(CopyError::Read)?;
        if n == 0 {
            break;
        }
        writers
            .write(Bytes::copy_from_slice(&buf[..n]))
            .await
            .map_err(CopyError::Write)?;
        copied += n;
    }
    Ok(copied)
}

/// Drive `source` into `writers` under `limit` until end of stream or failure.
///
/// Returns the number of bytes broadcast. Failures are also pushed to `errors`.
pub async fn broadcast<R>(
    source: &mut R,
    mut writers: MultiWriter,
    limit: RateLimit,
    errors: &ErrorSink,
) -> Result<u64, AppError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let quota = limit.quota_bytes.max(1);
    let mut buf = vec![0u8; limit.chunk_size.clamp(1, quota)];
    let tick = limit.tick.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut total: u64 = 0;
    let mut ticks: u64 = 0;
    let outcome = loop {
        ticker.tick().await;
        ticks += 1;
        match copy_quota(source, &mut writers, quota, &mut buf).await {
            Ok(copied) => {
                total += copied as u64;
                tracing::debug!(tick = ticks, copied, total, "Broadcast tick");
                if copied < quota {
                    break Ok(total);
                }
            }
            Err(err) => break Err(err),
        }
    };

    match outcome {
        Ok(total) => {
            writers.close();
            tracing::debug!(total, ticks, consumers = writers.len(), "Broadcast complete");
            Ok(total)
        }
        // Record the error before closing so consumers failing on the close lose the race
        Err(CopyError::Read(err)) => {
            tracing::warn!(error = %err, total, "Broadcast aborted by source error");
            let message = format!("failed to read upload stream: {}", err);
            errors.push(AppError::BadRequest(message.clone()));
            writers.close_with_error(&err);
            Err(AppError::BadRequest(message))
        }
        Err(CopyError::Write(err)) => {
            tracing::warn!(error = %err, total, "Broadcast aborted by consumer error");
            let message = format!("consumer rejected upload stream: {}", err);
            errors.push(AppError::StorageFailure(message.clone()));
            writers.close_with_error(&err);
            Err(AppError::StorageFailure(message))
        }
    }
}
