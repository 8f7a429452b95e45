//! Request model.
//!
//! [`GenerationRequest`] describes a whole sprite; [`FetchRequest`] describes
//! one thumbnail fetched from the packager. The thumbnail URL form produced
//! by [`FetchRequest::url`] is the packager's contract and must stay stable.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;

use crate::encode::SpriteFormat;
use crate::error::SpriteError;
use crate::layout::{GridLayout, Timeline};
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// A single thumbnail to fetch from the packager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Thumbnail prefix URL returned by the translator.
    pub prefix: String,
    /// Offset into the video at which the thumbnail is captured.
    pub timecode: Duration,
    /// Requested width in pixels, 0 to let the packager decide.
    pub width: u32,
    /// Requested height in pixels, 0 to let the packager decide.
    pub height: u32,
    /// Ask for a source-aspect thumbnail to be letterboxed into `width`.
    pub letterbox: bool,
}

impl FetchRequest {
    /// The packager URL of this thumbnail.
    ///
    /// `{prefix}/thumb-{ms}[-w{width}][-h{height}].jpg`, with the timecode
    /// truncated to whole milliseconds. The width is left out when
    /// letterboxing so the packager keeps the source aspect ratio.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use vod_sprite::FetchRequest;
    ///
    /// let request = FetchRequest {
    ///     prefix: "http://packager/thumb/movie/".to_string(),
    ///     timecode: Duration::from_secs(2),
    ///     width: 128,
    ///     height: 72,
    ///     letterbox: false,
    /// };
    /// assert_eq!(request.url(), "http://packager/thumb/movie/thumb-2000-w128-h72.jpg");
    /// ```
    pub fn url(&self) -> String {
        let mut name = format!("thumb-{}", self.timecode.as_millis());
        if self.width > 0 && !self.letterbox {
            name.push_str(&format!("-w{}", self.width));
        }
        if self.height > 0 {
            name.push_str(&format!("-h{}", self.height));
        }
        format!("{}/{name}.jpg", self.prefix.trim_end_matches('/'))
    }
}

/// A decoded thumbnail together with the request that produced it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The decoded thumbnail.
    pub image: DynamicImage,
    /// The request it answers; its timecode decides the grid cell.
    pub request: FetchRequest,
}

/// What to do when a single thumbnail cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Any failure aborts the whole sprite. This is the default.
    #[default]
    Abort,
    /// Skippable failures leave their cell empty; see
    /// [`SpriteError::is_skippable`].
    SkipFailedCells,
}

impl FailurePolicy {
    /// Whether `error` must abort the generation under this policy.
    pub fn is_fatal(self, error: &SpriteError) -> bool {
        match self {
            FailurePolicy::Abort => true,
            FailurePolicy::SkipFailedCells => !error.is_skippable(),
        }
    }
}

/// Options controlling the generation of one sprite.
///
/// Built with [`GenerationRequest::new`] and the `with_*` methods. Defaults:
/// start at zero, end at two minutes, a single column, source-sized cells,
/// JPEG at quality 80, abort on the first failure.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use vod_sprite::GenerationRequest;
///
/// let request = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2))
///     .with_range(Duration::ZERO, Duration::from_secs(18))
///     .with_height(72)
///     .with_columns(2);
/// assert_eq!(request.count(), 10);
/// assert_eq!(request.layout().rows(), 5);
/// ```
#[derive(Clone)]
#[must_use]
pub struct GenerationRequest {
    /// Application-level video identifier handed to the translator.
    pub video_url: String,
    /// Timecode of the first thumbnail.
    pub start: Duration,
    /// Last timecode that may be sampled (inclusive).
    pub end: Duration,
    /// Distance between thumbnails. Must be non-zero.
    pub interval: Duration,
    /// Requested cell width, 0 for the packager's choice.
    pub width: u32,
    /// Requested cell height, 0 for the packager's choice.
    pub height: u32,
    /// Grid columns; 0 means a single column.
    pub columns: u32,
    /// Output encoding.
    pub format: SpriteFormat,
    /// Letterbox source-aspect thumbnails into `width`-wide cells.
    pub keep_aspect_ratio: bool,
    /// Skip cells whose fetch fails with a skippable error.
    pub continue_on_error: bool,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for GenerationRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GenerationRequest")
            .field("video_url", &self.video_url)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("interval", &self.interval)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("columns", &self.columns)
            .field("format", &self.format)
            .field("keep_aspect_ratio", &self.keep_aspect_ratio)
            .field("continue_on_error", &self.continue_on_error)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationRequest {
    /// Create a request for `video_url`, sampled every `interval`.
    pub fn new(video_url: impl Into<String>, interval: Duration) -> Self {
        Self {
            video_url: video_url.into(),
            start: Duration::ZERO,
            end: Duration::from_secs(120),
            interval,
            width: 0,
            height: 0,
            columns: 0,
            format: SpriteFormat::default(),
            keep_aspect_ratio: false,
            continue_on_error: false,
            cancellation: None,
            timeout: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the inclusive time range to sample.
    pub fn with_range(mut self, start: Duration, end: Duration) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Set the requested cell width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the requested cell height.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Set the number of grid columns (0 for a single column).
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    /// Set the output encoding.
    pub fn with_format(mut self, format: SpriteFormat) -> Self {
        self.format = format;
        self
    }

    /// Preserve the source aspect ratio by letterboxing each thumbnail
    /// inside a cell of the requested width.
    pub fn with_keep_aspect_ratio(mut self, keep: bool) -> Self {
        self.keep_aspect_ratio = keep;
        self
    }

    /// Omit cells that fail with a skippable error instead of aborting.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, generation stops and returns
    /// [`SpriteError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Give up with [`SpriteError::DeadlineExceeded`] if the thumbnails are
    /// not all in after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a progress callback, fired once per drawn or skipped cell.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Check the range invariants: non-zero interval, `end >= start`, and a
    /// thumbnail count that fits in a `u32`.
    pub fn validate(&self) -> Result<(), SpriteError> {
        if self.interval.is_zero() {
            return Err(SpriteError::InvalidInterval);
        }
        if self.end < self.start {
            return Err(SpriteError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        let count = self.samples();
        if count > u128::from(u32::MAX) {
            return Err(SpriteError::TooManyThumbnails { count });
        }
        Ok(())
    }

    /// Number of thumbnails in the sprite, `floor((end - start) / interval) + 1`.
    ///
    /// Returns 0 for a request that fails [`validate`](Self::validate).
    pub fn count(&self) -> u32 {
        if self.validate().is_err() {
            return 0;
        }
        u32::try_from(self.samples()).unwrap_or(0)
    }

    fn samples(&self) -> u128 {
        (self.end - self.start).as_nanos() / self.interval.as_nanos() + 1
    }

    /// Grid layout of the sprite.
    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.count(), self.columns)
    }

    /// Sampling timeline of the sprite.
    pub fn timeline(&self) -> Timeline {
        Timeline {
            start: self.start,
            interval: self.interval,
        }
    }

    /// The failure policy selected by `continue_on_error`.
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.continue_on_error {
            FailurePolicy::SkipFailedCells
        } else {
            FailurePolicy::Abort
        }
    }

    /// Whether thumbnails are letterboxed into the requested width.
    ///
    /// Only meaningful with an explicit width.
    pub(crate) fn letterbox(&self) -> bool {
        self.keep_aspect_ratio && self.width > 0
    }

    /// The fetch requests of this sprite in increasing timecode order.
    pub fn fetch_requests(&self, prefix: &str) -> FetchRequests {
        FetchRequests {
            prefix: prefix.to_string(),
            next: Some(self.start),
            end: self.end,
            interval: self.interval,
            width: self.width,
            height: self.height,
            letterbox: self.letterbox(),
            remaining: self.count(),
        }
    }
}

/// Iterator over the [`FetchRequest`]s of a [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct FetchRequests {
    prefix: String,
    next: Option<Duration>,
    end: Duration,
    interval: Duration,
    width: u32,
    height: u32,
    letterbox: bool,
    remaining: u32,
}

impl Iterator for FetchRequests {
    type Item = FetchRequest;

    fn next(&mut self) -> Option<FetchRequest> {
        if self.remaining == 0 {
            return None;
        }
        let timecode = self.next.filter(|timecode| *timecode <= self.end)?;
        self.remaining -= 1;
        self.next = timecode.checked_add(self.interval);
        Some(FetchRequest {
            prefix: self.prefix.clone(),
            timecode,
            width: self.width,
            height: self.height,
            letterbox: self.letterbox,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FetchRequests {}
