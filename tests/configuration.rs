//! GenerationRequest, GeneratorConfig, and SpriteFormat tests.

use std::time::Duration;

use vod_sprite::{
    CancellationToken, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WORKERS, FailurePolicy,
    GenerationRequest, Generator, GeneratorConfig, PathTranslator, SpriteFormat,
};

// ── GenerationRequest builder ──────────────────────────────────────

#[test]
fn request_defaults() {
    let request = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2));
    assert_eq!(request.start, Duration::ZERO);
    assert_eq!(request.end, Duration::from_secs(120));
    assert_eq!(request.format, SpriteFormat::jpeg(DEFAULT_JPEG_QUALITY));
    assert_eq!(request.failure_policy(), FailurePolicy::Abort);
    assert_eq!(request.count(), 61);

    let debug = format!("{request:?}");
    assert!(debug.contains("GenerationRequest"));
    assert!(debug.contains("has_cancellation: false"));
    assert!(debug.contains("timeout: None"));
}

#[test]
fn request_with_cancellation_and_timeout() {
    let request = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2))
        .with_cancellation(CancellationToken::new())
        .with_timeout(Duration::from_secs(30));
    let debug = format!("{request:?}");
    assert!(debug.contains("has_cancellation: true"));
    assert!(debug.contains("timeout: Some(30s)"));
}

#[test]
fn zero_columns_is_a_vertical_strip() {
    let layout = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2))
        .with_range(Duration::ZERO, Duration::from_secs(18))
        .layout();
    assert_eq!((layout.columns(), layout.rows()), (1, 10));
}

#[test]
fn non_multiple_range_keeps_last_whole_interval() {
    let request = GenerationRequest::new("/videos/movie.mp4", Duration::from_secs(2))
        .with_range(Duration::from_secs(1), Duration::from_secs(18));
    let last = request.fetch_requests("http://packager/thumb/movie").last().unwrap();
    assert_eq!(request.count(), 9);
    assert_eq!(last.timecode, Duration::from_secs(17));
}

// ── GeneratorConfig builder ────────────────────────────────────────

#[test]
fn config_defaults() {
    let config = GeneratorConfig::new();
    assert_eq!(config.max_workers(), DEFAULT_MAX_WORKERS);
    let debug = format!("{config:?}");
    assert!(debug.contains("GeneratorConfig"));
    assert!(debug.contains("vod-sprite/"));
}

#[test]
fn config_with_max_workers_clamps_zero() {
    let config = GeneratorConfig::new().with_max_workers(0);
    // Clamped to 1.
    assert_eq!(config.max_workers(), 1);
}

#[test]
fn generator_keeps_its_config() {
    let generator = Generator::new(
        PathTranslator::nginx_vod("http://localhost:3030"),
        GeneratorConfig::new()
            .with_max_workers(8)
            .with_connect_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(10))
            .with_user_agent("sprite-tests"),
    )
    .unwrap();
    assert_eq!(generator.config().max_workers(), 8);
    assert!(format!("{generator:?}").contains("sprite-tests"));
}

// ── SpriteFormat ───────────────────────────────────────────────────

#[test]
fn format_extensions_and_display() {
    assert_eq!(SpriteFormat::default().extension(), "jpg");
    assert_eq!(SpriteFormat::Png.extension(), "png");
    assert_eq!(SpriteFormat::jpeg(90).to_string(), "JPEG (quality 90)");
    assert_eq!(SpriteFormat::Png.to_string(), "PNG");
}
