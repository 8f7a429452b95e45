use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vod_sprite::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WORKERS, GenerationRequest, Generator, GeneratorConfig,
    PathTranslator, ProgressCallback, ProgressInfo, SpriteFormat,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vod-sprite --url /videos/devito480p.mp4 --height 72 --columns 10 -o sprite.jpg\n  vod-sprite --url /videos/devito480p.mp4 --width 200 --height 72 --keep-aspect-ratio --end 18s\n  vod-sprite --url /videos/clip.mp4 --interval 500ms --end 01:30 --format png --json\n  vod-sprite completions zsh > _vod-sprite";

#[derive(Debug, Parser)]
#[command(
    name = "vod-sprite",
    version,
    about = "Build thumbnail sprite sheets from a VOD packager",
    after_help = CLI_AFTER_HELP,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    sprite: SpriteOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone)]
struct SpriteOptions {
    /// Video packager endpoint.
    #[arg(long, default_value = "http://localhost:3030")]
    packager: String,

    /// Maximum number of concurrent thumbnail fetches.
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Output file.
    #[arg(short, long, default_value = "thumb.jpg")]
    out: PathBuf,

    /// Video URL, e.g. /videos/devito480p.mp4.
    #[arg(long)]
    url: Option<String>,

    /// Thumbnail width in pixels (0 lets the packager decide).
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Thumbnail height in pixels (0 lets the packager decide).
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// Distance between thumbnails (90, 1m30s, 500ms, 01:30).
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    interval: Duration,

    /// First timecode.
    #[arg(long, default_value = "0", value_parser = parse_duration)]
    start: Duration,

    /// Last timecode that may be sampled.
    #[arg(long, default_value = "2m", value_parser = parse_duration)]
    end: Duration,

    /// Grid columns (0 or 1 for a vertical strip).
    #[arg(long, default_value_t = 0)]
    columns: u32,

    /// JPEG quality, 1 to 100.
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Output format (jpg, png). Defaults to the output file extension.
    #[arg(long)]
    format: Option<String>,

    /// Letterbox source-aspect thumbnails into --width wide cells.
    #[arg(long)]
    keep_aspect_ratio: bool,

    /// Leave cells empty when the packager fails to render them.
    #[arg(long)]
    continue_on_error: bool,

    /// Give up after this long.
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Print a JSON summary instead of plain text.
    #[arg(long)]
    json: bool,

    /// Allow overwriting an existing output file.
    #[arg(long)]
    overwrite: bool,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return seconds_to_duration(seconds, trimmed);
    }

    if trimmed.contains(':') {
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(format!("invalid duration: {trimmed}"));
        }
        let mut total = 0.0;
        for (index, part) in parts.iter().enumerate() {
            let parsed = part
                .parse::<f64>()
                .map_err(|_| format!("invalid duration: {trimmed}"))?;
            // Only the seconds field may be fractional.
            if index + 1 < parts.len() && parsed.fract() != 0.0 {
                return Err(format!("invalid duration: {trimmed}"));
            }
            total = total * 60.0 + parsed;
        }
        return seconds_to_duration(total, trimmed);
    }

    let mut total = 0.0;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration: {trimmed}"));
        }
        let amount = rest[..digits]
            .parse::<f64>()
            .map_err(|_| format!("invalid duration: {trimmed}"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            unit => return Err(format!("unknown duration unit {unit:?} in {trimmed}")),
        };
        rest = &rest[unit_len..];
        total += amount * scale;
    }
    seconds_to_duration(total, trimmed)
}

fn seconds_to_duration(seconds: f64, original: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(seconds).map_err(|_| format!("invalid duration: {original}"))
}

fn parse_format(value: &str, quality: u8) -> Option<SpriteFormat> {
    match value.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(SpriteFormat::jpeg(quality)),
        "png" => Some(SpriteFormat::Png),
        _ => None,
    }
}

fn resolve_format(options: &SpriteOptions) -> Result<SpriteFormat, Box<dyn std::error::Error>> {
    if let Some(format) = &options.format {
        return parse_format(format, options.quality)
            .ok_or_else(|| format!("unsupported --format: {format}").into());
    }
    let from_extension = options
        .out
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(|extension| parse_format(extension, options.quality));
    Ok(from_extension.unwrap_or(SpriteFormat::jpeg(options.quality)))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "vod_sprite=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(timecode) = info.timecode {
            self.bar.set_message(format!("{:.1}s", timecode.as_secs_f64()));
        }
    }
}

async fn generate(options: SpriteOptions) -> Result<(), Box<dyn std::error::Error>> {
    let url = options
        .url
        .clone()
        .ok_or("missing --url (e.g. --url /videos/devito480p.mp4)")?;
    let format = resolve_format(&options)?;
    ensure_writable_path(&options.out, options.overwrite)?;

    let generator = Generator::new(
        PathTranslator::nginx_vod(options.packager.as_str()),
        GeneratorConfig::new().with_max_workers(options.max_workers),
    )?;

    let mut request = GenerationRequest::new(url, options.interval)
        .with_range(options.start, options.end)
        .with_width(options.width)
        .with_height(options.height)
        .with_columns(options.columns)
        .with_format(format)
        .with_keep_aspect_ratio(options.keep_aspect_ratio)
        .with_continue_on_error(options.continue_on_error);
    if let Some(timeout) = options.timeout {
        request = request.with_timeout(timeout);
    }

    let progress = options
        .progress
        .then(|| Arc::new(TerminalProgress::new(u64::from(request.count()))));
    if let Some(progress) = &progress {
        request = request.with_progress(progress.clone());
    }

    let outcome = generator.compose(request).await;
    if let Some(progress) = &progress {
        progress.bar.finish_and_clear();
    }
    let sprite = outcome?;

    let image = sprite.image;
    let (bytes, image) =
        tokio::task::spawn_blocking(move || format.encode(&image).map(|bytes| (bytes, image)))
            .await??;
    fs::write(&options.out, &bytes)?;

    if options.json {
        let payload = json!({
            "output": options.out.display().to_string(),
            "format": format.to_string(),
            "bytes": bytes.len(),
            "width": image.width(),
            "height": image.height(),
            "columns": sprite.layout.columns(),
            "rows": sprite.layout.rows(),
            "thumbnails": sprite.layout.count(),
            "cell_width": sprite.cell_width,
            "cell_height": sprite.cell_height,
            "skipped_ms": sprite.skipped.iter().map(|timecode| timecode.as_millis() as u64).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {} ({}x{}, {} thumbnail(s) on a {}x{} grid)",
            "saved".green().bold(),
            options.out.display(),
            image.width(),
            image.height(),
            sprite.layout.count(),
            sprite.layout.columns(),
            sprite.layout.rows()
        );
        if !sprite.skipped.is_empty() {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("{} cell(s) left empty after packager errors", sprite.skipped.len()).yellow()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "vod-sprite", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.sprite.verbose);
    generate(cli.sprite).await
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_duration, parse_format};
    use clap::CommandFactory;
    use std::time::Duration;
    use vod_sprite::SpriteFormat;

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("01:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("01:00:30.5").unwrap(), Duration::from_millis(3_630_500));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("-3").is_err());
        assert!(parse_duration("1:2:3:4").is_err());
    }

    #[test]
    fn parse_format_aliases() {
        assert_eq!(parse_format("jpg", 80), Some(SpriteFormat::jpeg(80)));
        assert_eq!(parse_format("JPEG", 90), Some(SpriteFormat::jpeg(90)));
        assert_eq!(parse_format("png", 80), Some(SpriteFormat::Png));
        assert!(parse_format("gif", 80).is_none());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
