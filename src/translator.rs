//! Video URL translation.
//!
//! A [`Translator`] maps the application-level video identifier of a
//! [`GenerationRequest`](crate::GenerationRequest) to the packager's
//! thumbnail prefix URL, the part of the thumbnail URL that comes before
//! `thumb-{timecode}…`.
//!
//! Any `Fn(&str) -> Result<String, BoxError>` is a translator. For the
//! common case of rewriting the video path and pointing it at a packager
//! endpoint, use [`PathTranslator`].

use regex::Regex;
use reqwest::Url;

use crate::error::BoxError;

/// Translates a video identifier into a thumbnail prefix URL.
///
/// Implementations must reject identifiers that do not have the expected
/// shape; the generator treats any error as fatal before fetching anything.
pub trait Translator: Send + Sync {
    /// Return the thumbnail prefix URL for `video_url`.
    fn translate(&self, video_url: &str) -> Result<String, BoxError>;
}

impl<F> Translator for F
where
    F: Fn(&str) -> Result<String, BoxError> + Send + Sync,
{
    fn translate(&self, video_url: &str) -> Result<String, BoxError> {
        self(video_url)
    }
}

/// Rewrites the path of a video URL with a regular expression and joins it
/// to a packager endpoint.
///
/// The video URL may be absolute (`http://host/videos/a.mp4`) or a bare
/// path (`/videos/a.mp4`); only its path takes part in the rewrite. Paths
/// the pattern does not match are rejected.
///
/// # Example
///
/// ```
/// use vod_sprite::{PathTranslator, Translator};
///
/// let translator = PathTranslator::nginx_vod("http://localhost:3030/");
/// let prefix = translator.translate("http://cdn/videos/devito480p.mp4").unwrap();
/// assert_eq!(prefix, "http://localhost:3030/thumb/devito480p.mp4");
///
/// assert!(translator.translate("/movies/devito480p.mp4").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PathTranslator {
    endpoint: String,
    pattern: Regex,
    replacement: String,
}

impl PathTranslator {
    /// Create a translator that rewrites paths matching `pattern` with
    /// `replacement` (which may use `$1`-style capture references).
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid `pattern`.
    pub fn new(
        endpoint: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let endpoint = endpoint.into();
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    /// nginx-vod-module layout: `/videos/{path}` is served as
    /// `{endpoint}/thumb/{path}`.
    pub fn nginx_vod(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            pattern: nginx_vod_pattern(),
            replacement: "/thumb/$1".to_string(),
        }
    }

    /// The packager endpoint prefixes are joined to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Translator for PathTranslator {
    fn translate(&self, video_url: &str) -> Result<String, BoxError> {
        let path = video_path(video_url)?;
        if !self.pattern.is_match(&path) {
            return Err(format!("invalid video url {video_url:?}: unexpected path {path:?}").into());
        }
        let rewritten = self.pattern.replace(&path, self.replacement.as_str());
        Ok(format!("{}{rewritten}", self.endpoint))
    }
}

fn nginx_vod_pattern() -> Regex {
    Regex::new(r"^/videos/(.*)$").expect("nginx-vod pattern is a valid regex")
}

/// Extract the path of an absolute URL or a bare path.
fn video_path(video_url: &str) -> Result<String, BoxError> {
    if video_url.starts_with('/') {
        let path = video_url.split(['?', '#']).next().unwrap_or_default();
        return Ok(path.to_string());
    }
    let url = Url::parse(video_url)?;
    Ok(url.path().to_string())
}
