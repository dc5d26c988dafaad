//! In-process byte pipes
//!
//! A pipe carries one chunk at a time from a `PipeWriter` to a `PipeReader`, so a
//! writer waits until its reader has taken the previous chunk. Either end can be
//! closed with an error: a reader-side error fails the next write, a writer-side
//! error is returned by the reader once buffered data is consumed. Only an explicit
//! `close` is EOF: a writer dropped while open reads as a broken pipe, so a cancelled
//! upload never looks complete to its consumers.

use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// Error captured at one end of a pipe, replayed to the other end
#[derive(Debug, Clone)]
struct CapturedError {
    kind: io::ErrorKind,
    message: String,
}

impl CapturedError {
    fn from_io(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    fn to_io(&self) -> io::Error {
        io::Error::new(self.kind, self.message.clone())
    }
}

#[derive(Debug, Default)]
struct Shared {
    reader_error: Mutex<Option<CapturedError>>,
    writer_error: Mutex<Option<CapturedError>>,
}

impl Shared {
    fn reader_error(&self) -> Option<io::Error> {
        lock(&self.reader_error).as_ref().map(CapturedError::to_io)
    }

    fn writer_error(&self) -> Option<io::Error> {
        lock(&self.writer_error).as_ref().map(CapturedError::to_io)
    }
}

fn lock(slot: &Mutex<Option<CapturedError>>) -> std::sync::MutexGuard<'_, Option<CapturedError>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create a connected writer/reader pair
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(1);
    let shared = Arc::new(Shared::default());
    (
        PipeWriter {
            tx: Some(tx),
            shared: Arc::clone(&shared),
        },
        PipeReader {
            rx,
            pending: Bytes::new(),
            shared,
        },
    )
}

/// Sending half of a pipe
#[derive(Debug)]
pub struct PipeWriter {
    tx: Option<mpsc::Sender<Bytes>>,
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Hand one chunk to the reader, waiting until it has room.
    pub async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        if let Some(err) = self.shared.reader_error() {
            return Err(err);
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "write on closed pipe"))?;
        if chunk.is_empty() {
            return Ok(());
        }
        tx.send(chunk).await.map_err(|_| {
            self.shared.reader_error().unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped")
            })
        })
    }

    /// Signal EOF to the reader
    pub fn close(&mut self) {
        self.tx.take();
    }

    /// Signal `err` to the reader instead of EOF. Never blocks.
    pub fn close_with_error(&mut self, err: &io::Error) {
        if self.tx.is_some() {
            lock(&self.shared.writer_error).get_or_insert_with(|| CapturedError::from_io(err));
        }
        self.tx.take();
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let err = io::Error::new(io::ErrorKind::BrokenPipe, "writer dropped before close");
            self.close_with_error(&err);
        }
    }
}

/// Receiving half of a pipe
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Stop accepting data and fail the writer's next write with `err`
    pub fn close_with_error(&mut self, err: &io::Error) {
        lock(&self.shared.reader_error).get_or_insert_with(|| CapturedError::from_io(err));
        self.pending = Bytes::new();
        self.rx.close();
    }
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        loop {
            if !this.pending.is_empty() {
                let n = buf.remaining().min(this.pending.len());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }
            if let Some(err) = this.shared.reader_error() {
                return Poll::Ready(Err(err));
            }
            match ready!(this.rx.poll_recv(cx)) {
                Some(chunk) => this.pending = chunk,
                None => {
                    return Poll::Ready(match this.shared.writer_error() {
                        Some(err) => Err(err),
                        None => Ok(()),
                    })
                }
            }
        }
    }
}

/// Writes every chunk to each inner writer in turn.
///
/// A chunk reaches writer `n + 1` only after writer `n` accepted it, so the slowest
/// reader paces all of them.
#[derive(Debug, Default)]
pub struct MultiWriter {
    writers: Vec<PipeWriter>,
}

impl MultiWriter {
    pub fn new(writers: Vec<PipeWriter>) -> Self {
        Self { writers }
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Fails on the first writer whose reader is gone or closed with an error
    pub async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.write(chunk.clone()).await?;
        }
        Ok(())
    }

    pub fn close(&mut self) {
        for writer in &mut self.writers {
            writer.close();
        }
    }

    pub fn close_with_error(&mut self, err: &io::Error) {
        for writer in &mut self.writers {
            writer.close_with_error(err);
        }
    }
}

/// Read `reader` to the end, discarding the bytes
pub async fn drain<R>(reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    tokio::io::copy(reader, &mut tokio::io::sink()).await
}
