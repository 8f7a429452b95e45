//! # vod-sprite
//!
//! Build thumbnail sprite sheets from a VOD packager.
//!
//! Packagers such as nginx-vod-module render a still of a video on demand at
//! `{prefix}/thumb-{timecode_ms}-w{width}-h{height}.jpg`. `vod-sprite` asks
//! for one such thumbnail every `interval` between two timecodes, fetching
//! them concurrently with a bounded worker pool, and lays them out in a
//! single grid image (a vertical strip, a horizontal strip, or any number of
//! columns), ready to be served as a scrubbing preview.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use vod_sprite::{GenerationRequest, Generator, GeneratorConfig, PathTranslator};
//!
//! # async fn example() -> Result<(), vod_sprite::SpriteError> {
//! let generator = Generator::new(
//!     PathTranslator::nginx_vod("http://localhost:3030"),
//!     GeneratorConfig::default(),
//! )?;
//!
//! let request = GenerationRequest::new("/videos/devito480p.mp4", Duration::from_secs(2))
//!     .with_range(Duration::ZERO, Duration::from_secs(18))
//!     .with_width(200)
//!     .with_height(72)
//!     .with_keep_aspect_ratio(true)
//!     .with_columns(5);
//!
//! let jpeg = generator.generate(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Bounded concurrency**: at most `max_workers` fetches in flight,
//!   never more than the sprite needs
//! - **Any grid shape**: vertical, horizontal, or multi-column layouts
//! - **Letterboxing**: source-aspect thumbnails centered in fixed-width cells
//! - **Partial failure policy**: skip cells the packager failed to render,
//!   while still aborting on invalid requests
//! - **Cancellation & deadlines**: cooperative [`CancellationToken`] and
//!   per-request timeouts; every task is stopped before the call returns
//! - **Progress callbacks**: one notification per drawn or skipped cell
//! - **JPEG or PNG output**

pub mod compositor;
pub mod config;
pub mod encode;
pub mod error;
mod feeder;
pub mod generator;
pub mod layout;
pub mod progress;
pub mod request;
pub mod translator;
mod worker;

pub use compositor::{Compositor, Placement};
pub use config::{DEFAULT_MAX_WORKERS, GeneratorConfig};
pub use encode::{DEFAULT_JPEG_QUALITY, SpriteFormat};
pub use error::{BoxError, PackagerError, SpriteError};
pub use generator::{Generator, Sprite};
pub use layout::{GridLayout, Timeline};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use request::{FailurePolicy, FetchRequest, FetchRequests, FetchResult, GenerationRequest};
pub use translator::{PathTranslator, Translator};
