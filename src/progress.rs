//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring sprite generation,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use vod_sprite::{
//!     CancellationToken, GenerationRequest, ProgressCallback, ProgressInfo,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% of the sprite done");
//!         }
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let request = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2))
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of sprite generation progress.
///
/// Delivered to [`ProgressCallback::on_progress`] each time a cell is drawn
/// or skipped.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many cells have been handled (drawn or skipped) so far.
    pub current: u64,
    /// Total cells in the sprite.
    pub total: u64,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the workers started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Timecode of the cell that was just handled.
    pub timecode: Option<Duration>,
}

/// Trait for receiving progress updates during generation.
///
/// Callbacks are invoked from the coordinating task and must be [`Send`]
/// and [`Sync`]. They observe but cannot halt the operation; use a
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called after each cell is drawn or skipped.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token.
///
/// Clone this token and share it between tasks; call
/// [`cancel`](CancellationToken::cancel) from anywhere to stop the
/// associated generation. Async code can wait on
/// [`cancelled`](CancellationToken::cancelled) instead of polling.
///
/// # Example
///
/// ```
/// use vod_sprite::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// All clones of this token observe the cancellation and every pending
    /// [`cancelled`](CancellationToken::cancelled) future resolves.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Wait until the token is cancelled.
    ///
    /// Resolves immediately if cancellation was already requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }
}

/// One-shot shutdown signal shared by the feeder, the workers and the
/// coordinator of a single generation call.
///
/// A child of the caller's cancellation token: raised either internally
/// (`abort`) on a fatal error, or when the caller cancels. Aborting never
/// cancels the caller's token.
#[derive(Debug, Clone)]
pub(crate) struct Shutdown {
    token: tokio_util::sync::CancellationToken,
}

impl Shutdown {
    pub(crate) fn new(external: CancellationToken) -> Self {
        Self {
            token: external.inner.child_token(),
        }
    }

    /// Broadcast the abort to every holder of this signal.
    pub(crate) fn abort(&self) {
        self.token.cancel();
    }

    /// Resolve once the abort is raised or the caller cancels.
    pub(crate) async fn raised(&self) {
        self.token.cancelled().await;
    }
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one handled cell and fire the callback.
    pub(crate) fn advance(&mut self, timecode: Duration) {
        self.current += 1;

        let elapsed = self.start_time.elapsed();
        let percentage = (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0);
        let remaining = self.total.saturating_sub(self.current);
        let estimated_remaining = u32::try_from(self.current)
            .ok()
            .zip(u32::try_from(remaining).ok())
            .map(|(done, left)| elapsed / done * left);

        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            timecode: Some(timecode),
        });
    }
}
