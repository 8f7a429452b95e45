//! Thumbnail fetch workers.
//!
//! A [`WorkerPool`] is a fixed set of tasks sharing one work queue. Each
//! worker pulls a [`FetchRequest`], downloads the thumbnail with the shared
//! HTTP client, decodes it, and publishes a [`FetchResult`]. Failures go to
//! a separate queue where the coordinator decides whether they are fatal.
//! Workers never retry.

use async_channel::Receiver;
use image::DynamicImage;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinSet;

use crate::error::{PackagerError, SpriteError};
use crate::progress::Shutdown;
use crate::request::{FailurePolicy, FetchRequest, FetchResult};

/// A failed fetch, reported to the coordinator.
#[derive(Debug)]
pub(crate) struct FetchFailure {
    pub(crate) request: FetchRequest,
    pub(crate) error: SpriteError,
}

/// Channels and signals shared by every worker of a pool.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) client: Client,
    pub(crate) queue: Receiver<FetchRequest>,
    pub(crate) results: Sender<FetchResult>,
    pub(crate) failures: Sender<FetchFailure>,
    pub(crate) policy: FailurePolicy,
    pub(crate) shutdown: Shutdown,
}

/// A running set of fetch workers.
pub(crate) struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Spawn `count` workers.
    ///
    /// The pool's result and failure queues close once every worker has
    /// exited, which is how the coordinator learns the work is done.
    pub(crate) fn spawn(count: usize, context: WorkerContext) -> Self {
        let mut workers = JoinSet::new();
        for id in 0..count {
            workers.spawn(run_worker(id, context.clone()));
        }
        log::debug!("Spawned {count} thumbnail worker(s)");
        Self { workers }
    }

    /// Wait for every worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`SpriteError::TaskFailed`] if a worker panicked.
    pub(crate) async fn join(mut self) -> Result<(), SpriteError> {
        let mut outcome = Ok(());
        while let Some(joined) = self.workers.join_next().await {
            if let Err(error) = joined {
                log::warn!("Thumbnail worker failed: {error}");
                outcome = Err(SpriteError::from(error));
            }
        }
        outcome
    }
}

async fn run_worker(id: usize, context: WorkerContext) {
    let WorkerContext {
        client,
        queue,
        results,
        failures,
        policy,
        shutdown,
    } = context;

    loop {
        let request = tokio::select! {
            biased;
            _ = shutdown.raised() => return,
            next = queue.recv() => match next {
                Ok(request) => request,
                // Closed and drained: the feeder is done.
                Err(_) => return,
            },
        };

        let fetched = tokio::select! {
            biased;
            _ = shutdown.raised() => return,
            fetched = fetch_thumbnail(&client, &request) => fetched,
        };

        match fetched {
            Ok(image) => {
                let result = FetchResult { image, request };
                tokio::select! {
                    biased;
                    _ = shutdown.raised() => return,
                    published = results.send(result) => {
                        if published.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(error) => {
                let fatal = policy.is_fatal(&error);
                log::debug!(
                    "Worker {id} failed to fetch {:?} ({}): {error}",
                    request.timecode,
                    if fatal { "fatal" } else { "skippable" }
                );
                let failure = FetchFailure { request, error };
                tokio::select! {
                    biased;
                    _ = shutdown.raised() => return,
                    reported = failures.send(failure) => {
                        if reported.is_err() {
                            return;
                        }
                    }
                }
                if fatal {
                    return;
                }
            }
        }
    }
}

/// Download and decode a single thumbnail.
pub(crate) async fn fetch_thumbnail(
    client: &Client,
    request: &FetchRequest,
) -> Result<DynamicImage, SpriteError> {
    let url = request.url();
    log::trace!("GET {url}");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| SpriteError::Transport {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| SpriteError::Transport {
            url: url.clone(),
            source,
        })?;

    if status != StatusCode::OK {
        return Err(PackagerError {
            status_code: status.as_u16(),
            response_body: body.to_vec(),
        }
        .into());
    }

    // Decoding is CPU-bound; keep it off the async workers.
    tokio::task::spawn_blocking(move || image::load_from_memory(&body))
        .await?
        .map_err(|source| SpriteError::Decode { url, source })
}
