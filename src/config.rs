use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::scroll::{ListScrollSettings, PageScrollSettings};

/// Default client identification sent by the automated browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default listing target when `YT_URL` is not set
pub const DEFAULT_LISTING_URL: &str = "https://www.youtube.com/@aiconference/videos";

/// Configuration for the corpus builder
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Browser session settings
    pub browser: BrowserSettings,

    /// Playlist/channel discovery settings
    pub listing: ListingSettings,

    /// Transcript panel and extraction settings
    pub transcript: TranscriptSettings,

    /// Batch transcript run settings
    pub batch: BatchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,

    /// Pass --no-sandbox / --disable-setuid-sandbox (needed in most containers)
    pub no_sandbox: bool,

    /// Locale for the browsing context
    pub locale: String,

    /// User agent override
    pub user_agent: String,

    /// Explicit Chrome/Chromium binary; auto-detected when unset
    pub chrome_executable: Option<PathBuf>,

    pub window_width: u32,
    pub window_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSettings {
    /// Playlist or channel-videos URL
    pub url: String,

    /// Keep only videos uploaded within this many days (0 = keep all)
    pub days_threshold: i64,

    /// Directory for the CSV/JSON discovery output
    pub output_dir: PathBuf,

    pub navigation_timeout_ms: u64,
    pub playlist_selector_timeout_ms: u64,
    pub channel_selector_timeout_ms: u64,

    /// Pixels scrolled per poll
    pub scroll_step_px: u32,
    pub scroll_poll_ms: u64,

    /// Unchanged polls at the bottom before the page counts as fully loaded
    pub scroll_stable_polls: u32,

    /// Hard ceiling on total scrolling time
    pub scroll_ceiling_ms: u64,

    /// Pause after scrolling for lazy-loaded renderers
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// End-to-end budget per video
    pub timeout_ms: u64,

    /// Prefix each line with its timestamp label
    pub include_timestamps: bool,

    pub title_wait_ms: u64,
    pub consent_settle_ms: u64,
    pub overflow_attempts: u32,
    pub escape_pause_ms: u64,
    pub popup_timeout_ms: u64,
    pub panel_probe_ms: u64,
    pub expand_pause_ms: u64,
    pub poll_interval_ms: u64,

    pub list_wait_ms: u64,
    pub list_settle_ms: u64,
    pub list_stable_iterations: u32,
    pub list_max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Directory for per-video transcript files
    pub output_dir: PathBuf,

    /// Process at most this many input items
    pub limit: Option<usize>,

    /// Pause between videos
    pub item_pause_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: true,
            locale: "en-US".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_executable: None,
            window_width: 1280,
            window_height: 900,
        }
    }
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_LISTING_URL.to_string(),
            days_threshold: 0,
            output_dir: PathBuf::from("."),
            navigation_timeout_ms: 30_000,
            playlist_selector_timeout_ms: 15_000,
            channel_selector_timeout_ms: 20_000,
            scroll_step_px: 100,
            scroll_poll_ms: 100,
            scroll_stable_polls: 20,
            scroll_ceiling_ms: 10_000,
            settle_ms: 2_000,
        }
    }
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            include_timestamps: true,
            title_wait_ms: 5_000,
            consent_settle_ms: 1_000,
            overflow_attempts: 3,
            escape_pause_ms: 300,
            popup_timeout_ms: 2_000,
            panel_probe_ms: 2_000,
            expand_pause_ms: 200,
            poll_interval_ms: 300,
            list_wait_ms: 15_000,
            list_settle_ms: 150,
            list_stable_iterations: 3,
            list_max_iterations: 50,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("transcripts"),
            limit: None,
            item_pause_ms: 400,
        }
    }
}

impl ListingSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn page_scroll(&self) -> PageScrollSettings {
        PageScrollSettings {
            step_px: self.scroll_step_px,
            poll: Duration::from_millis(self.scroll_poll_ms),
            stable_polls: self.scroll_stable_polls,
            ceiling: Duration::from_millis(self.scroll_ceiling_ms),
        }
    }
}

impl TranscriptSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn list_scroll(&self) -> ListScrollSettings {
        ListScrollSettings {
            wait_timeout: Duration::from_millis(self.list_wait_ms),
            settle: Duration::from_millis(self.list_settle_ms),
            stable_iterations: self.list_stable_iterations,
            max_iterations: self.list_max_iterations,
        }
    }
}

impl BatchSettings {
    pub fn item_pause(&self) -> Duration {
        Duration::from_millis(self.item_pause_ms)
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = ["yt-corpus.toml", "config/yt-corpus.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("YT_URL") {
            if !url.trim().is_empty() {
                self.listing.url = url.trim().to_string();
            }
        }

        if let Ok(days) = std::env::var("DAYS") {
            match days.trim().parse::<i64>() {
                Ok(days) => self.listing.days_threshold = days,
                Err(_) => tracing::warn!("Ignoring non-numeric DAYS value: {}", days),
            }
        }

        if let Ok(headless) = std::env::var("YT_CORPUS_HEADLESS") {
            self.browser.headless = !matches!(headless.trim(), "0" | "false" | "no");
        }

        if let Ok(chrome) = std::env::var("YT_CORPUS_CHROME") {
            self.browser.chrome_executable = Some(PathBuf::from(chrome));
        }

        if let Ok(output_dir) = std::env::var("YT_CORPUS_OUTPUT_DIR") {
            self.batch.output_dir = PathBuf::from(output_dir);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.listing.url.trim().is_empty() {
            return Err(anyhow!("listing url must not be empty"));
        }

        if self.listing.scroll_step_px == 0 {
            return Err(anyhow!("scroll_step_px must be greater than 0"));
        }

        if self.transcript.timeout_ms == 0 {
            return Err(anyhow!("transcript timeout must be greater than 0"));
        }

        if self.transcript.list_max_iterations == 0 {
            return Err(anyhow!("list_max_iterations must be greater than 0"));
        }

        if self.batch.limit == Some(0) {
            return Err(anyhow!("batch limit must be at least 1"));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "yt-corpus configuration:\n\
            - Headless: {}\n\
            - Locale: {}\n\
            - Listing URL: {}\n\
            - Days threshold: {}\n\
            - Transcript timeout: {}ms\n\
            - Timestamps: {}\n\
            - Transcript output: {}",
            self.browser.headless,
            self.browser.locale,
            self.listing.url,
            self.listing.days_threshold,
            self.transcript.timeout_ms,
            self.transcript.include_timestamps,
            self.batch.output_dir.display(),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.browser.headless = headless;
        self
    }

    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.config.listing.url = url.into();
        self
    }

    pub fn with_days_threshold(mut self, days: i64) -> Self {
        self.config.listing.days_threshold = days;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.transcript.timeout_ms = timeout_ms;
        self
    }

    pub fn include_timestamps(mut self, include: bool) -> Self {
        self.config.transcript.include_timestamps = include;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.batch.output_dir = dir;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.config.batch.limit = limit;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
