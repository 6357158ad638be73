use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use yt_corpus::batch::{self, BatchRunner};
use yt_corpus::{BrowserSession, Config, Deadline, TranscriptExtractor};

const DEFAULT_DISCOVERY_FILE: &str = "channel_videos.json";

/// Exit code when a single video has no transcript
const EXIT_NO_TRANSCRIPT: i32 = 2;

enum Mode {
    Single(String),
    Batch(PathBuf),
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("yt-transcript")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Extract video transcripts from a single URL or a discovery JSON file")
        .arg(
            Arg::new("input")
                .value_name("URL|FILE.json")
                .help("Watch-page URL, or a discovery JSON file for batch mode"),
        )
        .arg(
            Arg::new("from-json")
                .long("from-json")
                .value_name("PATH")
                .help("Batch mode from a discovery JSON file")
                .num_args(0..=1)
                .default_missing_value(DEFAULT_DISCOVERY_FILE),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("DIR")
                .help("Output directory for transcript files (batch mode)"),
        )
        .arg(
            Arg::new("headful")
                .long("headful")
                .help("Show the browser window")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-timestamps")
                .long("no-timestamps")
                .help("Omit segment timestamps from the transcript")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Per-video timeout in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("N")
                .help("Process at most N videos (batch mode)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    yt_corpus::init_tracing(matches.get_flag("verbose"));

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::from_env()
    });

    if matches.get_flag("headful") {
        config.browser.headless = false;
    }
    if matches.get_flag("no-timestamps") {
        config.transcript.include_timestamps = false;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.transcript.timeout_ms = *timeout;
    }
    if let Some(out) = matches.get_one::<String>("out") {
        config.batch.output_dir = PathBuf::from(out);
    }
    if let Some(limit) = matches.get_one::<usize>("limit") {
        config.batch.limit = Some((*limit).max(1));
    }
    config.validate()?;

    let input = matches.get_one::<String>("input");
    let mode = match (matches.get_one::<String>("from-json"), input) {
        (Some(path), _) => Mode::Batch(PathBuf::from(path)),
        (None, Some(input)) if input.ends_with(".json") => Mode::Batch(PathBuf::from(input)),
        (None, Some(input)) if input.starts_with("http") => Mode::Single(input.clone()),
        _ => {
            return Err(anyhow!(
                "Usage: yt-transcript <video_url> | --from-json[=channel_videos.json] [--out DIR] [--headful] [--no-timestamps] [--timeout MS] [--limit N]"
            ));
        }
    };

    match mode {
        Mode::Single(url) => run_single(&config, &url).await,
        Mode::Batch(path) => run_batch(&config, &path).await,
    }
}

async fn run_single(config: &Config, url: &str) -> Result<()> {
    let session = BrowserSession::acquire(&config.browser).await?;
    let deadline = Deadline::after(config.transcript.timeout());

    let outcome = TranscriptExtractor::new(session.page(), &config.transcript)
        .extract(url, &deadline)
        .await;
    session.release().await;

    let result = outcome.context("Failed to extract transcript")?;
    if result.transcript.is_empty() {
        error!("No transcript segments found. The video may not have a transcript or the page layout changed.");
        std::process::exit(EXIT_NO_TRANSCRIPT);
    }

    println!("{}", result.transcript);
    Ok(())
}

async fn run_batch(config: &Config, path: &Path) -> Result<()> {
    let items = batch::load_discovery(path)
        .await
        .with_context(|| format!("Failed to read discovery file {}", path.display()))?;

    info!("{}", config.summary());

    let session = BrowserSession::acquire(&config.browser).await?;
    let outcome = BatchRunner::new(session.page(), &config.transcript, &config.batch)
        .run(&items, &config.batch.output_dir, config.batch.limit)
        .await;
    session.release().await;

    let summary = outcome?;
    println!("\nCompleted. {}", summary);
    if summary.skipped > 0 || summary.failed > 0 {
        info!("⏭️ Skipped: {}  ❌ Failed: {}", summary.skipped, summary.failed);
    }
    Ok(())
}
