//! yt-corpus - video transcript corpus builder
//!
//! Discovers the videos of a playlist or channel, filters them by upload recency and
//! extracts each video's transcript by driving a headless Chrome page.

pub mod batch;
pub mod browser;
pub mod config;
pub mod deadline;
pub mod error;
pub mod export;
pub mod freshness;
pub mod listing;
pub mod scroll;
pub mod transcript;

// Re-export main types for easy access
pub use crate::batch::{BatchItem, BatchRunSummary, BatchRunner};
pub use crate::browser::{BrowserSession, ChromiumPage, Locator, PageDriver};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::deadline::Deadline;
pub use crate::error::{Result, ScrapeError};
pub use crate::listing::{ListingKind, ListingScraper, VideoRecord};
pub use crate::transcript::{TranscriptExtractor, TranscriptResult, TranscriptSegment};

/// Initialize stderr logging for the binaries; `RUST_LOG` takes precedence
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "yt_corpus=debug,warn"
    } else {
        "yt_corpus=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
