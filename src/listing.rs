//! Playlist and channel video discovery
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{self, ListItemQuery, Locator, PageDriver, RawListItem, RawListing, WaitState, WaitUntil};
use crate::config::ListingSettings;
use crate::error::Result;
use crate::freshness::UNKNOWN_UPLOAD_TIME;
use crate::scroll;

/// One video discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub title: String,
    pub url: String,
    pub channel_name: String,
    pub duration: String,
    pub playlist_index: String,
    pub upload_time_text: String,
}

/// Which listing layout a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Playlist,
    Channel,
}

impl ListingKind {
    pub fn from_url(url: &str) -> Self {
        let is_playlist = Regex::new(r"/playlist\?list=")
            .map(|re| re.is_match(url))
            .unwrap_or(false);
        if is_playlist {
            Self::Playlist
        } else {
            Self::Channel
        }
    }

    /// Base name for the CSV/JSON output files
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Playlist => "playlist_videos",
            Self::Channel => "channel_videos",
        }
    }

    fn item_selectors(self) -> &'static [&'static str] {
        match self {
            Self::Playlist => &["ytd-playlist-video-renderer", "ytd-playlist-video-list-renderer"],
            Self::Channel => &["ytd-rich-grid-media", "ytd-grid-video-renderer"],
        }
    }

    fn query(self) -> ListItemQuery {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match self {
            Self::Playlist => ListItemQuery {
                item_selectors: strings(&["ytd-playlist-video-renderer"]),
                link_selectors: strings(&["a#video-title", "h3 a", "a[href*=\"/watch\"]"]),
                channel_selectors: strings(&["#channel-name a", "ytd-channel-name a"]),
                duration_selectors: strings(&[
                    "#time-status span",
                    ".ytd-thumbnail-overlay-time-status-renderer",
                ]),
                index_selectors: strings(&["#index"]),
                meta_span_selector: None,
                page_channel_selectors: Vec::new(),
            },
            Self::Channel => ListItemQuery {
                item_selectors: strings(&["ytd-rich-grid-media", "ytd-grid-video-renderer"]),
                link_selectors: strings(&["a#video-title", "a#video-title-link", "a[href*=\"/watch\"]"]),
                channel_selectors: Vec::new(),
                duration_selectors: strings(&[
                    ".ytd-thumbnail-overlay-time-status-renderer",
                    "#time-status span",
                ]),
                index_selectors: Vec::new(),
                meta_span_selector: Some("#metadata-line span".to_string()),
                page_channel_selectors: strings(&[
                    "meta[itemprop=\"name\"][content]",
                    "yt-formatted-string.ytd-channel-name a",
                ]),
            },
        }
    }
}

/// Scrapes one listing page through a [`PageDriver`]
pub struct ListingScraper<'a, P: PageDriver + ?Sized> {
    page: &'a P,
    settings: &'a ListingSettings,
}

impl<'a, P: PageDriver + ?Sized> ListingScraper<'a, P> {
    pub fn new(page: &'a P, settings: &'a ListingSettings) -> Self {
        Self { page, settings }
    }

    /// Dispatch on the URL shape
    pub async fn scrape(&self, url: &str) -> Result<Vec<VideoRecord>> {
        match ListingKind::from_url(url) {
            ListingKind::Playlist => self.scrape_playlist(url).await,
            ListingKind::Channel => self.scrape_channel(url).await,
        }
    }

    pub async fn scrape_playlist(&self, url: &str) -> Result<Vec<VideoRecord>> {
        info!("📋 Scraping playlist: {}", url);
        self.open(url).await?;
        self.collect(ListingKind::Playlist, self.settings.playlist_selector_timeout_ms)
            .await
    }

    pub async fn scrape_channel(&self, url: &str) -> Result<Vec<VideoRecord>> {
        info!("📺 Scraping channel: {}", url);
        self.open(url).await?;

        let current = self.page.current_url().await?;
        if !is_videos_tab(&current) {
            match self.page.first_href_matching("/videos$").await? {
                Some(videos_url) => {
                    info!("↪️ Switching to videos tab: {}", videos_url);
                    self.open(&videos_url).await?;
                }
                None => debug!("no videos tab link on {}, scraping landing page", current),
            }
        }

        self.collect(ListingKind::Channel, self.settings.channel_selector_timeout_ms)
            .await
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.page
            .navigate(url, WaitUntil::NetworkIdle, self.settings.navigation_timeout())
            .await
    }

    async fn collect(&self, kind: ListingKind, selector_timeout_ms: u64) -> Result<Vec<VideoRecord>> {
        let renderers: Vec<Locator> = kind.item_selectors().iter().map(|s| Locator::css(*s)).collect();
        let matched = browser::wait_for_any(
            self.page,
            &renderers,
            WaitState::Attached,
            Duration::from_millis(selector_timeout_ms),
            self.settings.page_scroll().poll,
        )
        .await?;
        debug!("listing renderers present ({})", matched);

        let report = scroll::scroll_page_to_end(self.page, &self.settings.page_scroll()).await?;
        debug!("listing scroll finished: {:?}", report);
        self.page.pause(self.settings.settle()).await;

        let raw = self.page.collect_list_items(&kind.query()).await?;
        let records = build_records(kind, &raw);
        info!("📹 Found {} videos ({} items on page)", records.len(), raw.items.len());
        Ok(records)
    }
}

fn is_videos_tab(url: &str) -> bool {
    Regex::new(r"/videos(\?|$)")
        .map(|re| re.is_match(url))
        .unwrap_or(false)
}

fn first_present(slots: &[Option<String>]) -> Option<String> {
    slots
        .iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn raw page reads into records, skipping items without a link or title
pub fn build_records(kind: ListingKind, raw: &RawListing) -> Vec<VideoRecord> {
    let page_channel = first_present(&raw.page_channel).unwrap_or_default();

    raw.items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| build_record(kind, position, item, &page_channel))
        .collect()
}

fn build_record(
    kind: ListingKind,
    position: usize,
    item: &RawListItem,
    page_channel: &str,
) -> Option<VideoRecord> {
    let link = item.links.iter().flatten().find(|link| !link.href.trim().is_empty())?;
    let title = link.text.trim();
    if title.is_empty() {
        return None;
    }

    let fallback_index = (position + 1).to_string();
    let (channel_name, playlist_index, upload_time_text) = match kind {
        ListingKind::Playlist => (
            first_present(&item.channels).unwrap_or_default(),
            first_present(&item.indexes).unwrap_or(fallback_index),
            UNKNOWN_UPLOAD_TIME.to_string(),
        ),
        ListingKind::Channel => (
            page_channel.to_string(),
            fallback_index,
            infer_upload_time(&item.meta_spans),
        ),
    };

    Some(VideoRecord {
        title: title.to_string(),
        url: link.href.trim().to_string(),
        channel_name,
        duration: first_present(&item.durations).unwrap_or_default(),
        playlist_index,
        upload_time_text,
    })
}

/// Pick the upload label out of a channel item's metadata line
pub fn infer_upload_time(spans: &[String]) -> String {
    let relative = Regex::new(r"(?i)ago|Streamed|Premiered").ok();
    if let Some(re) = relative {
        if let Some(span) = spans.iter().map(|s| s.trim()).find(|s| re.is_match(s)) {
            return span.to_string();
        }
    }

    [spans.get(1), spans.get(0)]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Human-readable listing, one block per video
pub fn report(records: &[VideoRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}. {}\n   URL: {}\n   Channel: {}\n   Duration: {}\n   Uploaded: {}",
                r.playlist_index, r.title, r.url, r.channel_name, r.duration, r.upload_time_text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
