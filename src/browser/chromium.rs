//! [`PageDriver`] over the Chrome DevTools Protocol
use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{
    ListItemQuery, Locator, PageDriver, RawListing, RawSegment, ScrollMetrics, SegmentQuery,
    WaitUntil,
};
use crate::error::{Result, ScrapeError};

/// Quiet period required before the network counts as idle
const NETWORK_IDLE_MS: u64 = 500;

/// A chromiumoxide page; every DOM query runs as an in-page script
#[derive(Clone)]
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn into_inner(self) -> Page {
        self.page
    }

    async fn eval(&self, action: &'static str, script: String) -> Result<Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| ScrapeError::automation(action, e))?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| ScrapeError::automation(action, e))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Resource-count heuristic: idle once no new resource entries appear for a quiet period
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool> {
        let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        let script = format!(
            r#"(async () => {{
                const timeoutMs = {timeout_ms};
                const idleMs = {idle_ms};
                const interval = 100;
                const start = Date.now();
                const count = () => {{
                    try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
                }};
                let last = count();
                let stableMs = 0;
                while (Date.now() - start < timeoutMs) {{
                    await new Promise(r => setTimeout(r, interval));
                    const current = count();
                    if (document.readyState === 'complete' && current === last) {{
                        stableMs += interval;
                        if (stableMs >= idleMs) return {{ ok: true, waitedMs: Date.now() - start }};
                    }} else {{
                        stableMs = 0;
                    }}
                    last = current;
                }}
                return {{ ok: false, waitedMs: Date.now() - start }};
            }})()"#,
            timeout_ms = timeout_ms,
            idle_ms = NETWORK_IDLE_MS,
        );

        // Give the in-page loop a little slack to report before the outer timeout fires
        let outer = timeout + Duration::from_secs(1);
        let info = match tokio::time::timeout(outer, self.eval("network idle wait", script)).await {
            Ok(result) => result?,
            Err(_) => return Ok(false),
        };

        let ok = info.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let waited = info.get("waitedMs").and_then(Value::as_u64).unwrap_or(0);
        if ok {
            debug!("network idle after {}ms", waited);
        } else {
            warn!("network never went idle within {}ms", waited);
        }
        Ok(ok)
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let timed_out = || ScrapeError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        };

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Err(_) => return Err(timed_out()),
            Ok(Err(e)) => return Err(ScrapeError::automation("navigate", e)),
            Ok(Ok(_)) => {}
        }

        if wait == WaitUntil::NetworkIdle {
            let remaining = timeout.saturating_sub(started.elapsed());
            if !self.wait_for_network_idle(remaining).await? {
                return Err(timed_out());
            }
        }

        debug!("navigated to {} in {}ms", url, started.elapsed().as_millis());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ScrapeError::automation("read url", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> Result<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| ScrapeError::automation("read title", e))?;
        Ok(title.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let value = self
            .eval("count", locator.script("return found.length;"))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let value = self
            .eval(
                "visibility check",
                locator.script("return found.length > 0 && __ytVisible(found[0]);"),
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let clicked = self
            .eval(
                "click",
                locator.script(
                    "const el = found[0];\n\
                     if (!el) return false;\n\
                     el.scrollIntoView({ block: 'center' });\n\
                     el.click();\n\
                     return true;",
                ),
            )
            .await?;

        if clicked.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(ScrapeError::selector_not_found(locator.to_string()))
        }
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        let value = self
            .eval(
                "read text",
                locator.script("return found.length ? (found[0].textContent || '') : null;"),
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn first_href_matching(&self, pattern: &str) -> Result<Option<String>> {
        let pattern_json = serde_json::to_string(pattern)?;
        let script = format!(
            r#"(() => {{
                const re = new RegExp({});
                const anchor = Array.from(document.querySelectorAll('a'))
                    .find(a => a.getAttribute('href') && re.test(a.getAttribute('href')));
                return anchor ? anchor.href : null;
            }})()"#,
            pattern_json
        );
        let value = self.eval("find link", script).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let body = self
            .page
            .find_element("body")
            .await
            .map_err(|e| ScrapeError::automation("press key", e))?;
        body.press_key(key)
            .await
            .map_err(|e| ScrapeError::automation("press key", e))?;
        Ok(())
    }

    async fn scroll_window_by(&self, distance: u32) -> Result<ScrollMetrics> {
        let script = format!(
            r#"(() => {{
                window.scrollBy(0, {});
                const root = document.documentElement;
                const scrollHeight = root.scrollHeight;
                const atBottom = window.scrollY + window.innerHeight >= scrollHeight - 2;
                return {{ scrollHeight, atBottom }};
            }})()"#,
            distance
        );
        let value = self.eval("scroll window", script).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn scroll_container_to_end(&self, locator: &Locator) -> Result<Option<u64>> {
        let value = self
            .eval(
                "scroll container",
                locator.script(
                    "const el = found[0];\n\
                     if (!el) return null;\n\
                     el.scrollTop = el.scrollHeight;\n\
                     return el.scrollHeight;",
                ),
            )
            .await?;
        Ok(value.as_u64())
    }

    async fn collect_list_items(&self, query: &ListItemQuery) -> Result<RawListing> {
        let script = format!(
            r#"(() => {{
                const q = {query};
                const firstText = (root, selectors) => selectors.map((s) => {{
                    const el = root.querySelector(s);
                    return el ? (el.textContent || '').trim() : null;
                }});
                const pageChannel = q.pageChannelSelectors.map((s) => {{
                    const el = document.querySelector(s);
                    return el ? (el.getAttribute('content') || el.textContent || '').trim() : null;
                }});
                const nodes = q.itemSelectors.length
                    ? Array.from(document.querySelectorAll(q.itemSelectors.join(', ')))
                    : [];
                const items = nodes.map((el) => ({{
                    links: q.linkSelectors.map((s) => {{
                        const a = el.querySelector(s);
                        if (!a) return null;
                        return {{ href: a.href || a.getAttribute('href') || '', text: (a.textContent || '').trim() }};
                    }}),
                    channels: firstText(el, q.channelSelectors),
                    durations: firstText(el, q.durationSelectors),
                    indexes: firstText(el, q.indexSelectors),
                    metaSpans: q.metaSpanSelector
                        ? Array.from(el.querySelectorAll(q.metaSpanSelector)).map((s) => (s.textContent || '').trim())
                        : [],
                }}));
                return {{ pageChannel, items }};
            }})()"#,
            query = serde_json::to_string(query)?
        );
        let value = self.eval("read listing", script).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn collect_segments(&self, query: &SegmentQuery) -> Result<Vec<RawSegment>> {
        let script = format!(
            r#"(() => {{
                const q = {query};
                const firstText = (root, selectors) => selectors.map((s) => {{
                    const el = root.querySelector(s);
                    return el ? (el.textContent || '') : null;
                }});
                return Array.from(document.querySelectorAll(q.segmentSelector)).map((el) => ({{
                    times: firstText(el, q.timeSelectors),
                    texts: firstText(el, q.textSelectors),
                }}));
            }})()"#,
            query = serde_json::to_string(query)?
        );
        let value = self.eval("read transcript segments", script).await?;
        Ok(serde_json::from_value(value)?)
    }
}
