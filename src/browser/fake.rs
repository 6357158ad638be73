//! Scripted in-memory page for unit tests
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{
    ListItemQuery, Locator, PageDriver, RawListing, RawSegment, ScrollMetrics, SegmentQuery,
    WaitUntil,
};
use crate::error::{Result, ScrapeError};

#[derive(Default)]
struct FakeState {
    present: HashSet<Locator>,
    visible: HashSet<Locator>,
    reveals: HashMap<Locator, Vec<(Locator, bool)>>,
    texts: HashMap<Locator, String>,
    hrefs: HashMap<String, String>,
    failing_urls: HashSet<String>,
    url: String,
    title: String,
    window_scrolls: VecDeque<ScrollMetrics>,
    container_heights: VecDeque<Option<u64>>,
    listing: RawListing,
    segments: Vec<RawSegment>,
    clicks: Vec<Locator>,
    keys: Vec<String>,
    navigations: Vec<String>,
    list_queries: Vec<ListItemQuery>,
    container_scrolls: usize,
}

#[derive(Default)]
pub(crate) struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Attached but not visible
    pub fn attach(&self, locator: Locator) -> &Self {
        self.with(|s| {
            s.present.insert(locator);
        });
        self
    }

    pub fn show(&self, locator: Locator) -> &Self {
        self.with(|s| {
            s.present.insert(locator.clone());
            s.visible.insert(locator);
        });
        self
    }

    /// Clicking `trigger` makes `target` appear (visible)
    pub fn on_click_show(&self, trigger: Locator, target: Locator) -> &Self {
        self.with(|s| s.reveals.entry(trigger).or_default().push((target, true)));
        self
    }

    /// Clicking `trigger` attaches `target` without making it visible
    pub fn on_click_attach(&self, trigger: Locator, target: Locator) -> &Self {
        self.with(|s| s.reveals.entry(trigger).or_default().push((target, false)));
        self
    }

    pub fn set_text(&self, locator: Locator, text: &str) -> &Self {
        self.with(|s| {
            s.texts.insert(locator, text.to_string());
        });
        self
    }

    pub fn set_href(&self, pattern: &str, href: &str) -> &Self {
        self.with(|s| {
            s.hrefs.insert(pattern.to_string(), href.to_string());
        });
        self
    }

    pub fn fail_navigation(&self, url: &str) -> &Self {
        self.with(|s| {
            s.failing_urls.insert(url.to_string());
        });
        self
    }

    pub fn set_title(&self, title: &str) -> &Self {
        self.with(|s| s.title = title.to_string());
        self
    }

    /// Successive window scroll results; the last one repeats
    pub fn script_window_scrolls(&self, metrics: Vec<ScrollMetrics>) -> &Self {
        self.with(|s| s.window_scrolls = metrics.into());
        self
    }

    /// Successive container heights; the last one repeats
    pub fn script_container_heights(&self, heights: Vec<Option<u64>>) -> &Self {
        self.with(|s| s.container_heights = heights.into());
        self
    }

    pub fn set_listing(&self, listing: RawListing) -> &Self {
        self.with(|s| s.listing = listing);
        self
    }

    pub fn set_segments(&self, segments: Vec<RawSegment>) -> &Self {
        self.with(|s| s.segments = segments);
        self
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.with(|s| s.clicks.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.with(|s| s.keys.clone())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.with(|s| s.navigations.clone())
    }

    pub fn list_queries(&self) -> Vec<ListItemQuery> {
        self.with(|s| s.list_queries.clone())
    }

    pub fn container_scrolls(&self) -> usize {
        self.with(|s| s.container_scrolls)
    }
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str, _wait: WaitUntil, timeout: Duration) -> Result<()> {
        self.with(|s| {
            s.navigations.push(url.to_string());
            if s.failing_urls.contains(url) {
                return Err(ScrapeError::NavigationTimeout {
                    url: url.to_string(),
                    timeout,
                });
            }
            s.url = url.to_string();
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.with(|s| s.url.clone()))
    }

    async fn title(&self) -> Result<String> {
        Ok(self.with(|s| s.title.clone()))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.with(|s| usize::from(s.present.contains(locator))))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.with(|s| s.visible.contains(locator)))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.with(|s| {
            if !s.present.contains(locator) {
                return Err(ScrapeError::selector_not_found(locator.to_string()));
            }
            s.clicks.push(locator.clone());
            if let Some(targets) = s.reveals.get(locator).cloned() {
                for (target, visible) in targets {
                    s.present.insert(target.clone());
                    if visible {
                        s.visible.insert(target);
                    }
                }
            }
            Ok(())
        })
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        Ok(self.with(|s| s.texts.get(locator).cloned()))
    }

    async fn first_href_matching(&self, pattern: &str) -> Result<Option<String>> {
        Ok(self.with(|s| s.hrefs.get(pattern).cloned()))
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.with(|s| s.keys.push(key.to_string()));
        Ok(())
    }

    async fn scroll_window_by(&self, _distance: u32) -> Result<ScrollMetrics> {
        Ok(self.with(|s| {
            next_scripted(&mut s.window_scrolls).unwrap_or(ScrollMetrics {
                scroll_height: 1000,
                at_bottom: true,
            })
        }))
    }

    async fn scroll_container_to_end(&self, locator: &Locator) -> Result<Option<u64>> {
        Ok(self.with(|s| {
            s.container_scrolls += 1;
            if !s.present.contains(locator) {
                return None;
            }
            next_scripted(&mut s.container_heights).flatten()
        }))
    }

    async fn collect_list_items(&self, query: &ListItemQuery) -> Result<RawListing> {
        Ok(self.with(|s| {
            s.list_queries.push(query.clone());
            s.listing.clone()
        }))
    }

    async fn collect_segments(&self, _query: &SegmentQuery) -> Result<Vec<RawSegment>> {
        Ok(self.with(|s| s.segments.clone()))
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration.min(Duration::from_millis(2))).await;
    }
}
