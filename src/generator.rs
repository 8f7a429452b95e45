//! Sprite generation.
//!
//! [`Generator`] is the entry point of the crate. Each call translates the
//! video identifier, starts the feeder and a worker pool, composites the
//! thumbnails as they arrive, and applies the failure policy. Whatever the
//! outcome, every task it started has exited by the time the call returns.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use vod_sprite::{GenerationRequest, Generator, GeneratorConfig, PathTranslator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Generator::new(
//!     PathTranslator::nginx_vod("http://localhost:3030"),
//!     GeneratorConfig::new().with_max_workers(16),
//! )?;
//! let request = GenerationRequest::new("/videos/devito480p.mp4", Duration::from_secs(2))
//!     .with_range(Duration::ZERO, Duration::from_secs(120))
//!     .with_height(72)
//!     .with_columns(10);
//! let jpeg = generator.generate(request).await?;
//! std::fs::write("sprite.jpg", jpeg)?;
//! # Ok(())
//! # }
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use reqwest::Client;
use tokio::sync::mpsc;

use crate::compositor::Compositor;
use crate::config::GeneratorConfig;
use crate::error::SpriteError;
use crate::feeder::spawn_feeder;
use crate::layout::GridLayout;
use crate::progress::{ProgressTracker, Shutdown};
use crate::request::{FailurePolicy, GenerationRequest};
use crate::translator::Translator;
use crate::worker::{FetchFailure, WorkerContext, WorkerPool};

/// A composited sprite, before encoding.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// The sprite canvas.
    pub image: RgbImage,
    /// Grid the thumbnails were laid out on.
    pub layout: GridLayout,
    /// Width of every cell.
    pub cell_width: u32,
    /// Height of every cell.
    pub cell_height: u32,
    /// Timecodes whose cells were left empty after a skippable failure,
    /// in increasing order.
    pub skipped: Vec<Duration>,
}

/// Lifecycle of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Translating,
    Running,
    Succeeded,
    Aborted,
    Failed,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Translating => "translating",
            Phase::Running => "running",
            Phase::Succeeded => "succeeded",
            Phase::Aborted => "aborted",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Generates sprites from packager thumbnails.
///
/// Holds the translator and one HTTP client reused by every call; a
/// `Generator` can serve concurrent calls.
pub struct Generator {
    translator: Arc<dyn Translator>,
    config: GeneratorConfig,
    client: Client,
}

impl Generator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns [`SpriteError::HttpClient`] if the HTTP client cannot be
    /// built (for example when TLS initialization fails).
    pub fn new(
        translator: impl Translator + 'static,
        config: GeneratorConfig,
    ) -> Result<Self, SpriteError> {
        let client = config.build_client()?;
        Ok(Self {
            translator: Arc::new(translator),
            config,
            client,
        })
    }

    /// The generator's configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the sprite and encode it with `request.format`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, [`SpriteError::Cancelled`],
    /// [`SpriteError::DeadlineExceeded`], or [`SpriteError::EmptySprite`]
    /// when every thumbnail was skipped. No bytes are produced on error.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Vec<u8>, SpriteError> {
        let format = request.format;
        let sprite = self.compose(request).await?;
        let image = sprite.image;
        tokio::task::spawn_blocking(move || format.encode(&image)).await?
    }

    /// Generate the sprite canvas without encoding it.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate), minus encoding errors.
    pub async fn compose(&self, request: GenerationRequest) -> Result<Sprite, SpriteError> {
        let mut phase = Phase::Idle;
        let outcome = self.run(&request, &mut phase).await;
        let finished = match &outcome {
            Ok(_) => Phase::Succeeded,
            Err(SpriteError::Cancelled | SpriteError::DeadlineExceeded(_)) => Phase::Aborted,
            Err(_) => Phase::Failed,
        };
        transition(&mut phase, finished, &request.video_url);
        outcome
    }

    async fn run(&self, request: &GenerationRequest, phase: &mut Phase) -> Result<Sprite, SpriteError> {
        request.validate()?;

        transition(phase, Phase::Translating, &request.video_url);
        let prefix = self
            .translator
            .translate(&request.video_url)
            .map_err(|source| SpriteError::Translation {
                video_url: request.video_url.clone(),
                source,
            })?;

        transition(phase, Phase::Running, &request.video_url);
        self.run_pipeline(request, &prefix).await
    }

    async fn run_pipeline(&self, request: &GenerationRequest, prefix: &str) -> Result<Sprite, SpriteError> {
        let layout = request.layout();
        let policy = request.failure_policy();
        let count = layout.count() as usize;
        let worker_count = self.config.worker_count(count);
        log::debug!(
            "Generating {count} thumbnail(s) from {prefix} on a {}x{} grid with {worker_count} worker(s)",
            layout.columns(),
            layout.rows()
        );

        let cancellation = request.cancellation.clone().unwrap_or_default();
        let shutdown = Shutdown::new(cancellation.clone());

        let (queue_sender, queue) = async_channel::bounded(worker_count);
        let (results_sender, mut results) = mpsc::channel(worker_count * 2);
        let (failures_sender, mut failures) = mpsc::channel(worker_count + 1);

        let feeder = spawn_feeder(request.fetch_requests(prefix), queue_sender, shutdown.clone());
        let pool = WorkerPool::spawn(
            worker_count,
            WorkerContext {
                client: self.client.clone(),
                queue,
                results: results_sender,
                failures: failures_sender,
                policy,
                shutdown: shutdown.clone(),
            },
        );

        let letterbox_width = request.letterbox().then_some(request.width);
        let mut compositor = Compositor::new(layout, request.timeline(), letterbox_width);
        let mut progress = ProgressTracker::new(request.progress.clone(), u64::from(layout.count()));
        let mut skipped = Vec::new();

        let deadline = async {
            match request.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => pending().await,
            }
        };
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break Err(SpriteError::Cancelled),
                _ = &mut deadline => {
                    break Err(SpriteError::DeadlineExceeded(request.timeout.unwrap_or_default()));
                }
                Some(failure) = failures.recv() => {
                    if let Err(error) = handle_failure(failure, policy, &mut skipped, &mut progress) {
                        break Err(error);
                    }
                }
                received = results.recv() => match received {
                    Some(result) => {
                        compositor.place(&result);
                        progress.advance(result.request.timecode);
                    }
                    None => break Ok(()),
                },
            }
        };

        // Every worker has exited once the result queue is closed, so any
        // failure still queued was sent before that.
        let outcome = outcome.and_then(|()| {
            while let Ok(failure) = failures.try_recv() {
                handle_failure(failure, policy, &mut skipped, &mut progress)?;
            }
            Ok(())
        });

        if outcome.is_err() {
            shutdown.abort();
        }
        drop(results);
        drop(failures);
        let joined = pool.join().await;
        let fed = feeder.await;
        outcome?;
        joined?;
        log::debug!("Feeder enqueued {} request(s)", fed?);

        skipped.sort_unstable();
        let (image, cell_width, cell_height) =
            compositor.finish_with_cell_size().ok_or(SpriteError::EmptySprite)?;
        Ok(Sprite {
            image,
            layout,
            cell_width,
            cell_height,
            skipped,
        })
    }
}

fn handle_failure(
    failure: FetchFailure,
    policy: FailurePolicy,
    skipped: &mut Vec<Duration>,
    progress: &mut ProgressTracker,
) -> Result<(), SpriteError> {
    if policy.is_fatal(&failure.error) {
        return Err(failure.error);
    }
    log::warn!(
        "Skipping thumbnail at {:?}: {}",
        failure.request.timecode,
        failure.error
    );
    skipped.push(failure.request.timecode);
    progress.advance(failure.request.timecode);
    Ok(())
}

fn transition(phase: &mut Phase, next: Phase, video_url: &str) {
    log::debug!("Sprite for {video_url}: {phase} -> {next}");
    *phase = next;
}

impl Debug for Generator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
