//! Run-scoped context shared by the components of one crawl run
//!
//! The coordinator creates a single `RunContext` per run and hands clones to
//! every fetch client it builds. It carries the request counter and the
//! run-level cancellation signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Shared, cheaply clonable handle to the state of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    requests: AtomicU64,
    cancel: CancellationToken,
    started: Instant,
}

impl RunContext {
    /// Creates a fresh context with a zeroed request counter
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Creates a context driven by an externally owned cancellation token
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                requests: AtomicU64::new(0),
                cancel,
                started: Instant::now(),
            }),
        }
    }

    /// Counts one outbound request
    pub(crate) fn record_request(&self) -> u64 {
        self.inner.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total number of outbound requests issued during this run
    pub fn request_count(&self) -> u64 {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Signals cancellation to every component holding this context
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Resolves once the run has been cancelled
    pub async fn cancelled(&self) {
        self.inner.cancel.cancelled().await
    }

    /// Returns a clone of the underlying token (e.g. for a Ctrl-C handler)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Time elapsed since the context was created
    pub fn elapsed(&self) -> Duration {
        self.inner.started.elapsed()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
