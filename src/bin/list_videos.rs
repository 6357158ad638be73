use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use yt_corpus::freshness::retain_fresh;
use yt_corpus::{export, listing, BrowserSession, Config, ListingKind, ListingScraper};

#[derive(Parser)]
#[command(name = "list-videos")]
#[command(about = "List the videos of a playlist or channel (reads YT_URL and DAYS)")]
struct Cli {
    /// Directory for the CSV/JSON output
    #[arg(long)]
    out: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    yt_corpus::init_tracing(cli.verbose);

    let mut config = Config::load()?;
    if let Some(out) = cli.out {
        config.listing.output_dir = out;
    }
    if cli.headful {
        config.browser.headless = false;
    }
    config.validate()?;

    let url = config.listing.url.clone();
    let kind = ListingKind::from_url(&url);
    info!("🔍 Listing {:?} videos from {}", kind, url);

    let session = BrowserSession::acquire(&config.browser).await?;
    let outcome = ListingScraper::new(session.page(), &config.listing)
        .scrape(&url)
        .await;
    session.release().await;

    let scraped = outcome.with_context(|| format!("Failed to scrape {}", url))?;
    let videos = retain_fresh(scraped, config.listing.days_threshold);

    if videos.is_empty() {
        warn!("No videos found");
        return Ok(());
    }

    if config.listing.days_threshold > 0 {
        info!(
            "📅 {} videos uploaded within the last {} days",
            videos.len(),
            config.listing.days_threshold
        );
    }
    println!("{}", listing::report(&videos));

    let written = export::write_listing(&videos, kind, &config.listing.output_dir).await?;
    info!("✅ Wrote {} files for {} videos", written.len(), videos.len());
    Ok(())
}
