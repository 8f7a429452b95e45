//! Generator configuration.
//!
//! [`GeneratorConfig`] is a builder holding the settings that outlive a single
//! sprite: the worker ceiling and how the shared HTTP client is tuned.
//! Per-call settings live on [`GenerationRequest`](crate::GenerationRequest).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use vod_sprite::GeneratorConfig;
//!
//! let config = GeneratorConfig::new()
//!     .with_max_workers(8)
//!     .with_request_timeout(Duration::from_secs(10));
//! assert_eq!(config.max_workers(), 8);
//! ```

use std::time::Duration;

use reqwest::Client;

use crate::error::SpriteError;

/// Default ceiling on concurrent thumbnail fetches.
pub const DEFAULT_MAX_WORKERS: usize = 32;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Generator`](crate::Generator).
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub(crate) max_workers: usize,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) user_agent: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorConfig {
    /// Create a configuration with default settings.
    ///
    /// Defaults: 32 workers, 5 second connect timeout, no per-request
    /// timeout, `vod-sprite/<version>` user agent.
    pub fn new() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the maximum number of concurrent fetch workers.
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Set the TCP connect timeout of the shared client.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound each thumbnail request, from send until the body is read.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header sent to the packager.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The configured worker ceiling.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers worth spawning for `count` thumbnails.
    ///
    /// Never more than half the items plus one, never more than the ceiling.
    pub(crate) fn worker_count(&self, count: usize) -> usize {
        (count / 2 + 1).min(self.max_workers).max(1)
    }

    /// Build the HTTP client shared by every worker.
    pub(crate) fn build_client(&self) -> Result<Client, SpriteError> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone());
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(SpriteError::HttpClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_bounded_by_items_and_ceiling() {
        let config = GeneratorConfig::new().with_max_workers(4);
        assert_eq!(config.worker_count(1), 1);
        assert_eq!(config.worker_count(2), 2);
        assert_eq!(config.worker_count(5), 3);
        assert_eq!(config.worker_count(10), 4);
        assert_eq!(config.worker_count(1000), 4);
    }

    #[test]
    fn max_workers_is_clamped_to_one() {
        let config = GeneratorConfig::new().with_max_workers(0);
        assert_eq!(config.max_workers(), 1);
        assert_eq!(config.worker_count(100), 1);
    }
}
