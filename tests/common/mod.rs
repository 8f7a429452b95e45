//! In-process fake packager shared by the integration tests.
//!
//! Serves `/thumbs/{rendition}/thumb-{ms}[-w{w}][-h{h}].jpg` with a solid
//! color JPEG per timecode. Thumbnails exist every two seconds from 0 to
//! 18 seconds; other timecodes get a 400, renditions named `missing` a 404,
//! and timecodes listed in `fail_at` a 500.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use regex::Regex;
use vod_sprite::{BoxError, Translator};

/// Native size of the packager's thumbnails.
pub const NATIVE_WIDTH: u32 = 128;
pub const NATIVE_HEIGHT: u32 = 72;

pub const VIDEO_URL: &str = "/video/2017/05/26/000000_1_CREDIT-SUISSE--O-_wg_360p.mp4";

#[derive(Default)]
struct PackagerState {
    fail_at: Vec<u64>,
    delay: Option<Duration>,
    requests: AtomicUsize,
}

pub struct FakePackager {
    addr: SocketAddr,
    state: Arc<PackagerState>,
}

impl FakePackager {
    pub async fn start() -> Self {
        Self::start_with(Vec::new(), None).await
    }

    pub async fn failing_at(fail_at: &[u64]) -> Self {
        Self::start_with(fail_at.to_vec(), None).await
    }

    pub async fn slow(delay: Duration) -> Self {
        Self::start_with(Vec::new(), Some(delay)).await
    }

    async fn start_with(fail_at: Vec<u64>, delay: Option<Duration>) -> Self {
        let state = Arc::new(PackagerState {
            fail_at,
            delay,
            requests: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/thumbs/*path", get(thumbnail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake packager");
        let addr = listener.local_addr().expect("fake packager address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake packager server");
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of thumbnail requests received so far.
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// `/video/{path}.mp4` becomes `{server}/thumbs/{path}`.
    pub fn translator(&self) -> impl Translator + 'static {
        let base = self.url();
        move |video_url: &str| -> Result<String, BoxError> {
            let path = video_url
                .strip_prefix("/video/")
                .ok_or("invalid videoURL")?;
            let path = path.strip_suffix(".mp4").unwrap_or(path);
            Ok(format!("{base}/thumbs/{path}"))
        }
    }
}

/// Color of the thumbnail captured at `timecode_ms`.
pub fn color_at(timecode_ms: u64) -> Rgb<u8> {
    let index = (timecode_ms / 2000) as u8;
    Rgb([20 + index * 23, 230 - index * 21, 40 + (index % 3) * 80])
}

/// Whether two colors are equal within JPEG round-trip tolerance.
pub fn close_to(actual: Rgb<u8>, expected: Rgb<u8>) -> bool {
    actual
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, b)| a.abs_diff(*b) <= 12)
}

async fn thumbnail(State(state): State<Arc<PackagerState>>, Path(path): Path<String>) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    let pattern = Regex::new(r"^(?P<rendition>.+)/thumb-(?P<ms>\d+)(?:-w(?P<w>\d+))?(?:-h(?P<h>\d+))?\.jpg$")
        .expect("thumbnail route pattern");
    let Some(captures) = pattern.captures(&path) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    if captures["rendition"].ends_with("missing") {
        return (StatusCode::NOT_FOUND, "unknown rendition").into_response();
    }

    let timecode: u64 = captures["ms"].parse().unwrap_or(u64::MAX);
    if state.fail_at.contains(&timecode) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "something went wrong").into_response();
    }
    if timecode > 18_000 || timecode % 2000 != 0 {
        return (StatusCode::BAD_REQUEST, "invalid timecode").into_response();
    }

    let dimension = |name: &str| captures.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
    let (width, height) = match (dimension("w"), dimension("h")) {
        (Some(width), Some(height)) => (width, height),
        (None, Some(height)) => (height * NATIVE_WIDTH / NATIVE_HEIGHT, height),
        (Some(width), None) => (width, width * NATIVE_HEIGHT / NATIVE_WIDTH),
        (None, None) => (NATIVE_WIDTH, NATIVE_HEIGHT),
    };

    let image = RgbImage::from_pixel(width, height, color_at(timecode));
    let mut body = Vec::new();
    if image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut body, 100))
        .is_err()
    {
        return (StatusCode::INTERNAL_SERVER_ERROR, "encode failed").into_response();
    }
    ([(header::CONTENT_TYPE, "image/jpeg")], body).into_response()
}
