//! Browser automation seam
//!
//! Everything that touches the rendered document goes through [`PageDriver`], so the
//! scraping and extraction logic can run against Chrome or against a scripted page in tests.

pub mod chromium;
pub mod locator;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use chromium::ChromiumPage;
pub use locator::Locator;
pub use session::BrowserSession;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// Navigation readiness condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitUntil {
    DomContentLoaded,
    Load,
    /// Load plus a quiet period with no new network resources
    NetworkIdle,
}

/// Element state a wait is satisfied by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Attached,
    Visible,
}

/// Window scroll measurement after one scroll step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_height: u64,
    pub at_bottom: bool,
}

/// Anchor found inside a listing item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawLink {
    pub href: String,
    pub text: String,
}

/// Per-item reads, one slot per candidate selector (None when that selector matched nothing)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListItem {
    pub links: Vec<Option<RawLink>>,
    pub channels: Vec<Option<String>>,
    pub durations: Vec<Option<String>>,
    pub indexes: Vec<Option<String>>,
    pub meta_spans: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListing {
    /// Page-level channel name candidates
    pub page_channel: Vec<Option<String>>,
    pub items: Vec<RawListItem>,
}

/// What to read from a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemQuery {
    pub item_selectors: Vec<String>,
    pub link_selectors: Vec<String>,
    pub channel_selectors: Vec<String>,
    pub duration_selectors: Vec<String>,
    pub index_selectors: Vec<String>,
    pub meta_span_selector: Option<String>,
    pub page_channel_selectors: Vec<String>,
}

/// One transcript segment node, one slot per candidate selector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSegment {
    pub times: Vec<Option<String>>,
    pub texts: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentQuery {
    pub segment_selector: String,
    pub time_selectors: Vec<String>,
    pub text_selectors: Vec<String>,
}

/// Operations the pipeline needs from one browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn count(&self, locator: &Locator) -> Result<usize>;

    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Click the first match, bypassing actionability checks
    async fn click(&self, locator: &Locator) -> Result<()>;

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>>;

    /// Absolute href of the first anchor whose href attribute matches `pattern`
    async fn first_href_matching(&self, pattern: &str) -> Result<Option<String>>;

    async fn press_key(&self, key: &str) -> Result<()>;

    async fn scroll_window_by(&self, distance: u32) -> Result<ScrollMetrics>;

    /// Force the first match's scrollTop to its scrollHeight; None if nothing matched
    async fn scroll_container_to_end(&self, locator: &Locator) -> Result<Option<u64>>;

    async fn collect_list_items(&self, query: &ListItemQuery) -> Result<RawListing>;

    async fn collect_segments(&self, query: &SegmentQuery) -> Result<Vec<RawSegment>>;

    /// Fixed wait used for render settling and pacing
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// True if the locator currently matches; probe errors count as no match
pub async fn probe<P: PageDriver + ?Sized>(page: &P, locator: &Locator) -> bool {
    match page.count(locator).await {
        Ok(count) => count > 0,
        Err(e) => {
            debug!("probe {} failed: {}", locator, e);
            false
        }
    }
}

async fn satisfies<P: PageDriver + ?Sized>(page: &P, locator: &Locator, state: WaitState) -> bool {
    if !probe(page, locator).await {
        return false;
    }
    match state {
        WaitState::Attached => true,
        WaitState::Visible => page.is_visible(locator).await.unwrap_or(false),
    }
}

/// Click if present; any failure is logged and reported as false
pub async fn try_click<P: PageDriver + ?Sized>(page: &P, locator: &Locator) -> bool {
    if !probe(page, locator).await {
        return false;
    }
    match page.click(locator).await {
        Ok(()) => {
            debug!("clicked {}", locator);
            true
        }
        Err(e) => {
            debug!("click on {} failed: {}", locator, e);
            false
        }
    }
}

/// Poll until one candidate reaches `state`, returning the first that did
pub async fn wait_for_any<'a, P: PageDriver + ?Sized>(
    page: &P,
    candidates: &'a [Locator],
    state: WaitState,
    timeout: Duration,
    poll: Duration,
) -> Result<&'a Locator> {
    let started = Instant::now();
    loop {
        for candidate in candidates {
            if satisfies(page, candidate, state).await {
                return Ok(candidate);
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(ScrapeError::selector_not_found(locator::describe(candidates)));
        }
        page.pause(poll.min(timeout - elapsed)).await;
    }
}

pub async fn wait_for_visible<P: PageDriver + ?Sized>(
    page: &P,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> Result<()> {
    wait_for_any(page, std::slice::from_ref(locator), WaitState::Visible, timeout, poll)
        .await
        .map(|_| ())
}
