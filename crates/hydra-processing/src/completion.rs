//! Completion tracking for concurrently running processors

use std::sync::Arc;
use tokio::sync::watch;

/// Counts outstanding participants; `wait` resolves once every guard is dropped.
#[derive(Debug, Clone)]
pub struct CompletionGroup {
    remaining: Arc<watch::Sender<usize>>,
}

impl CompletionGroup {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            remaining: Arc::new(tx),
        }
    }

    /// Register one participant. Completion is signalled when the guard drops,
    /// including on early return or panic.
    pub fn guard(&self) -> CompletionGuard {
        self.remaining.send_modify(|n| *n += 1);
        CompletionGuard {
            remaining: Arc::clone(&self.remaining),
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Wait until no guard is outstanding
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by one participant until it finishes
#[derive(Debug)]
pub struct CompletionGuard {
    remaining: Arc<watch::Sender<usize>>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }
}
