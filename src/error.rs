//! Error types for the `vod-sprite` crate.
//!
//! This module defines [`SpriteError`], the unified error type returned by all
//! fallible operations in the crate, and [`PackagerError`], the structured
//! error reported when the thumbnail service answers with a non-200 status.

use std::{error::Error as StdError, time::Duration};

use image::ImageError;
use thiserror::Error;

/// Boxed error returned by [`Translator`](crate::Translator) implementations.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A non-200 response from the video packager.
///
/// Carries the HTTP status code and the raw response body so callers can
/// tell an invalid request (4xx) from a packager failure (5xx).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid response from video packager: {status_code} - {}", String::from_utf8_lossy(.response_body))]
pub struct PackagerError {
    /// HTTP status code returned by the packager.
    pub status_code: u16,
    /// Raw response body.
    pub response_body: Vec<u8>,
}

impl PackagerError {
    /// Returns `true` for any non-5xx failure status.
    ///
    /// That is every 4xx, and also unexpected 1xx, 3xx and non-200 2xx
    /// answers: the packager did not fail, the request itself is wrong (bad
    /// timecode, unknown rendition), so other cells will not fare better.
    pub fn is_client_error(&self) -> bool {
        self.status_code < 500
    }

    /// Returns `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }
}

/// The unified error type for all `vod-sprite` operations.
///
/// Every public method that can fail returns `Result<T, SpriteError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpriteError {
    /// The video identifier could not be translated into a thumbnail prefix.
    #[error("Failed to translate video url {video_url}: {source}")]
    Translation {
        /// The identifier passed in the generation request.
        video_url: String,
        /// Reason given by the translator.
        #[source]
        source: BoxError,
    },

    /// An interval of zero was provided.
    #[error("Interval must be greater than zero")]
    InvalidInterval,

    /// The end of the time range precedes its start.
    #[error("Invalid range: start ({start:?}) must not be after end ({end:?})")]
    InvalidRange {
        /// The start of the range.
        start: Duration,
        /// The end of the range.
        end: Duration,
    },

    /// The range and interval describe more thumbnails than a sprite can hold.
    #[error("Too many thumbnails: {count} requested, at most {max} supported", max = u32::MAX)]
    TooManyThumbnails {
        /// Number of thumbnails the request describes.
        count: u128,
    },

    /// The thumbnail service could not be reached, or the response body
    /// could not be read.
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        /// The thumbnail URL being fetched.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The thumbnail service answered with a non-200 status.
    #[error(transparent)]
    Packager(#[from] PackagerError),

    /// A thumbnail body was not a decodable image.
    #[error("Failed to decode thumbnail {url}: {source}")]
    Decode {
        /// The thumbnail URL whose body failed to decode.
        url: String,
        /// Underlying decoder error.
        #[source]
        source: ImageError,
    },

    /// An error from the `image` crate while encoding the sprite.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The shared HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// The request's deadline elapsed before the sprite was complete.
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Every thumbnail was skipped, so there is nothing to encode.
    #[error("No thumbnail could be fetched; sprite is empty")]
    EmptySprite,

    /// A worker or feeder task panicked or was aborted by the runtime.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl SpriteError {
    /// Whether this error concerns a single thumbnail and may be skipped
    /// when the caller asked to continue on error.
    ///
    /// Client-side packager errors (4xx) are never skippable: they mean the
    /// whole request is invalid.
    pub fn is_skippable(&self) -> bool {
        match self {
            SpriteError::Transport { .. } | SpriteError::Decode { .. } => true,
            SpriteError::Packager(error) => error.is_server_error(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for SpriteError {
    fn from(error: tokio::task::JoinError) -> Self {
        SpriteError::TaskFailed(error.to_string())
    }
}
