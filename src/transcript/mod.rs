//! Watch-page transcript extraction
pub mod panel;
pub mod segments;

pub use panel::{OpenPanel, PanelOpener, PanelRoute};
pub use segments::{assemble_transcript, extract_segments, TranscriptSegment};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{self, Locator, PageDriver, WaitUntil};
use crate::config::TranscriptSettings;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::scroll;

/// Transcript text plus the watch page's real title
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    /// Newline-joined segments; empty when the video has none
    pub transcript: String,
    pub page_title: String,
}

/// Strip the trailing " - YouTube" from a document title
pub fn clean_page_title(title: &str) -> String {
    let cleaned = match Regex::new(r"(?i)\s*-\s*YouTube$") {
        Ok(re) => re.replace(title.trim(), "").into_owned(),
        Err(_) => title.trim().to_string(),
    };
    cleaned.trim().to_string()
}

pub struct TranscriptExtractor<'a, P: PageDriver + ?Sized> {
    page: &'a P,
    settings: &'a TranscriptSettings,
}

impl<'a, P: PageDriver + ?Sized> TranscriptExtractor<'a, P> {
    pub fn new(page: &'a P, settings: &'a TranscriptSettings) -> Self {
        Self { page, settings }
    }

    /// Open `url`, capture its title and read the full transcript within `deadline`
    pub async fn extract(&self, url: &str, deadline: &Deadline) -> Result<TranscriptResult> {
        info!("🎬 Opening video: {}", url);
        self.page
            .navigate(url, WaitUntil::DomContentLoaded, deadline.remaining())
            .await?;

        let page_title = self.capture_title(deadline).await;
        debug!("page title: {:?}", page_title);

        let panel = PanelOpener::new(self.page, self.settings).open(deadline).await?;

        let report =
            scroll::load_full_list(self.page, &panel.container, &self.settings.list_scroll(), deadline)
                .await?;
        debug!("transcript list: {:?}", report);

        let segments = extract_segments(self.page).await?;
        let transcript = assemble_transcript(&segments, self.settings.include_timestamps);
        info!("📝 Extracted {} transcript segments", segments.len());

        Ok(TranscriptResult {
            transcript,
            page_title,
        })
    }

    /// Heading text when it renders in time, otherwise the document title
    async fn capture_title(&self, deadline: &Deadline) -> String {
        let heading = Locator::css("h1 yt-formatted-string");
        let wait = deadline.cap(Duration::from_millis(self.settings.title_wait_ms));

        if browser::wait_for_visible(self.page, &heading, wait, self.settings.poll_interval())
            .await
            .is_ok()
        {
            if let Ok(Some(text)) = self.page.text_content(&heading).await {
                let text = segments::normalize_whitespace(&text);
                if !text.is_empty() {
                    return text;
                }
            }
        }

        match self.page.title().await {
            Ok(title) => clean_page_title(&title),
            Err(e) => {
                debug!("document title unavailable: {}", e);
                String::new()
            }
        }
    }
}
