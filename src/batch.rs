//! Batch transcript extraction over a discovery file
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use url::Url;

use crate::browser::PageDriver;
use crate::config::{BatchSettings, TranscriptSettings};
use crate::deadline::Deadline;
use crate::error::{Result, ScrapeError};
use crate::transcript::TranscriptExtractor;

const MAX_SLUG_LEN: usize = 80;

/// One entry of a discovery file. Only a URL (`url` or `link`) is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchItem {
    pub url: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    #[serde(deserialize_with = "deserialize_index")]
    pub playlist_index: Option<String>,
}

impl BatchItem {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// `url`, else `link`, ignoring blanks
    pub fn target_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.link.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|u| !u.is_empty())
    }
}

/// Accept the index as either a string or a number
fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DiscoveryFile {
    List(Vec<BatchItem>),
    Wrapped { videos: Vec<BatchItem> },
}

/// Parse a discovery document: a bare array, or an object with a `videos` array
pub fn parse_discovery(json: &str) -> Result<Vec<BatchItem>> {
    let parsed: DiscoveryFile = serde_json::from_str(json).map_err(|e| {
        ScrapeError::MalformedInput(format!(
            "expected an array or an object with a \"videos\" array ({})",
            e
        ))
    })?;

    let items = match parsed {
        DiscoveryFile::List(items) => items,
        DiscoveryFile::Wrapped { videos } => videos,
    };

    if items.is_empty() {
        return Err(ScrapeError::MalformedInput("no videos in input".to_string()));
    }
    Ok(items)
}

pub async fn load_discovery(path: &Path) -> Result<Vec<BatchItem>> {
    let json = tokio::fs::read_to_string(path).await?;
    let items = parse_discovery(&json)?;
    info!("📂 Loaded {} videos from {}", items.len(), path.display());
    Ok(items)
}

/// Video id from watch, youtu.be, shorts and live URLs
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str().unwrap_or_default();
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

    if host.contains("youtu.be") {
        return segments.next().map(str::to_string);
    }

    if let Some((_, v)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        if !v.is_empty() {
            return Some(v.into_owned());
        }
    }

    match segments.next() {
        Some("shorts") | Some("live") => segments.next().map(str::to_string),
        _ => None,
    }
}

/// Lowercase ASCII slug of at most 80 characters; applying it twice changes nothing
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    let mut slug = String::with_capacity(kept.len());
    for c in kept.chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    let trimmed = slug.trim_matches('-');
    let truncated: String = trimmed.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_matches('-').to_string()
}

/// `{index:0>3}-{slug}-{id}.txt`
pub fn output_filename(index_text: &str, title: &str, id: &str) -> String {
    let slug = match slugify(title) {
        s if s.is_empty() => "video".to_string(),
        s => s,
    };
    format!("{:0>3}-{}-{}.txt", index_text, slug, id)
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRunSummary {
    pub succeeded: usize,
    /// Items with a URL that extraction was tried on
    pub attempted: usize,
    /// Items without a URL
    pub skipped: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
}

impl fmt::Display for BatchRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transcripts saved: {}/{} → {}",
            self.succeeded,
            self.attempted,
            self.output_dir.display()
        )
    }
}

/// Processes discovery items one by one on a single page
pub struct BatchRunner<'a, P: PageDriver + ?Sized> {
    page: &'a P,
    transcript: &'a TranscriptSettings,
    batch: &'a BatchSettings,
}

impl<'a, P: PageDriver + ?Sized> BatchRunner<'a, P> {
    pub fn new(page: &'a P, transcript: &'a TranscriptSettings, batch: &'a BatchSettings) -> Self {
        Self {
            page,
            transcript,
            batch,
        }
    }

    /// Extract and save transcripts in input order. A failing item is logged and skipped.
    pub async fn run(
        &self,
        items: &[BatchItem],
        output_dir: &Path,
        limit: Option<usize>,
    ) -> Result<BatchRunSummary> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| ScrapeError::FileWrite {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let limit = limit.unwrap_or(items.len()).max(1);
        let total = items.len().min(limit);
        info!("🚀 Starting batch: {} videos → {}", total, output_dir.display());

        let mut summary = BatchRunSummary {
            output_dir: output_dir.to_path_buf(),
            ..BatchRunSummary::default()
        };
        let extractor = TranscriptExtractor::new(self.page, self.transcript);

        for (position, item) in items.iter().enumerate().take(limit) {
            let Some(url) = item.target_url() else {
                warn!("Skipping item {} without a URL", position + 1);
                summary.skipped += 1;
                continue;
            };
            summary.attempted += 1;

            let ordinal = (position + 1).to_string();
            let id = video_id(url).unwrap_or_else(|| ordinal.clone());
            let index_text = item.playlist_index.clone().unwrap_or(ordinal);

            info!("📹 Processing video {}/{}: {}", position + 1, total, url);
            let deadline = Deadline::after(self.transcript.timeout());

            match extractor.extract(url, &deadline).await {
                Ok(result) if result.transcript.is_empty() => {
                    warn!("⚠️ No transcript for: {}", url);
                }
                Ok(result) => {
                    let title = [Some(result.page_title.as_str()), item.title.as_deref()]
                        .into_iter()
                        .flatten()
                        .find(|t| !t.trim().is_empty())
                        .unwrap_or("video");
                    let path = output_dir.join(output_filename(&index_text, title, &id));

                    match tokio::fs::write(&path, &result.transcript).await {
                        Ok(()) => {
                            info!("✅ Saved: {}", path.display());
                            summary.succeeded += 1;
                            summary.written.push(path);
                        }
                        Err(source) => {
                            let e = ScrapeError::FileWrite { path, source };
                            warn!("❌ Failed ({}/{}): {} - {}", position + 1, total, url, e);
                            summary.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    if e.is_item_scoped() {
                        warn!("❌ Failed ({}/{}): {} - {}", position + 1, total, url, e);
                    } else {
                        error!("❌ Failed ({}/{}): {} - {}", position + 1, total, url, e);
                    }
                    summary.failed += 1;
                }
            }

            self.page.pause(self.batch.item_pause()).await;
        }

        info!("🎉 {}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::browser::RawSegment;
    use crate::transcript::panel::panel_containers;
    use tempfile::TempDir;

    fn fast_transcript() -> TranscriptSettings {
        TranscriptSettings {
            title_wait_ms: 5,
            consent_settle_ms: 1,
            escape_pause_ms: 1,
            popup_timeout_ms: 5,
            panel_probe_ms: 5,
            expand_pause_ms: 1,
            poll_interval_ms: 2,
            list_wait_ms: 20,
            list_settle_ms: 1,
            ..TranscriptSettings::default()
        }
    }

    fn fast_batch() -> BatchSettings {
        BatchSettings {
            item_pause_ms: 1,
            ..BatchSettings::default()
        }
    }

    fn ready_page() -> FakePage {
        let page = FakePage::new();
        page.set_title("Talk - YouTube");
        page.show(panel_containers()[0].clone());
        page.script_container_heights(vec![Some(300)]);
        page.set_segments(vec![RawSegment {
            times: vec![Some("0:01".to_string())],
            texts: vec![Some("hello".to_string())],
        }]);
        page
    }

    #[test]
    fn test_slugify_charset_and_bounds() {
        assert_eq!(slugify("  Hello, World! -- AI  Agents  "), "hello-world-ai-agents");
        assert_eq!(slugify("Ünïcode & émoji 🚀"), "ncode-moji");
        assert_eq!(slugify("!!!"), "");

        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= 80);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_idempotent() {
        let repeated = "ab ".repeat(50);
        for input in ["Agents & Tools: Part 2", "  --x--  ", repeated.as_str(), "Already-a-slug"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_video_id_forms() {
        assert_eq!(video_id("https://www.youtube.com/watch?v=abc123&t=5s").as_deref(), Some("abc123"));
        assert_eq!(video_id("https://youtu.be/xyz789?si=1").as_deref(), Some("xyz789"));
        assert_eq!(video_id("https://www.youtube.com/shorts/sh0rt").as_deref(), Some("sh0rt"));
        assert_eq!(video_id("https://www.youtube.com/live/l1ve").as_deref(), Some("l1ve"));
        assert_eq!(video_id("https://www.youtube.com/@chan/videos"), None);
        assert_eq!(video_id("not a url"), None);
    }

    #[test]
    fn test_output_filename_padding_and_fallback() {
        assert_eq!(output_filename("7", "My Talk", "abc"), "007-my-talk-abc.txt");
        assert_eq!(output_filename("1234", "x", "id"), "1234-x-id.txt");
        assert_eq!(output_filename("2", "???", "id"), "002-video-id.txt");
    }

    #[test]
    fn test_parse_discovery_shapes() {
        let items = parse_discovery(r#"[{"url": "https://youtu.be/a", "playlistIndex": 3}]"#).unwrap();
        assert_eq!(items[0].playlist_index.as_deref(), Some("3"));

        let items = parse_discovery(
            r#"{"scrapedDate": "x", "totalVideos": 1, "videos": [{"link": "https://youtu.be/b", "title": "B"}]}"#,
        )
        .unwrap();
        assert_eq!(items[0].target_url(), Some("https://youtu.be/b"));

        assert!(matches!(parse_discovery("[]"), Err(ScrapeError::MalformedInput(_))));
        assert!(matches!(parse_discovery(r#"{"items": []}"#), Err(ScrapeError::MalformedInput(_))));
        assert!(matches!(parse_discovery("42"), Err(ScrapeError::MalformedInput(_))));
    }

    #[tokio::test]
    async fn test_run_writes_files_named_from_page_title() {
        let dir = TempDir::new().unwrap();
        let page = ready_page();
        let (transcript, batch) = (fast_transcript(), fast_batch());
        let items = vec![BatchItem {
            url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            title: Some("Listing Title".to_string()),
            playlist_index: Some("4".to_string()),
            ..BatchItem::default()
        }];

        let summary = BatchRunner::new(&page, &transcript, &batch)
            .run(&items, dir.path(), None)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        let expected = dir.path().join("004-talk-abc.txt");
        assert_eq!(summary.written, vec![expected.clone()]);
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "0:01 hello");
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let dir = TempDir::new().unwrap();
        let page = ready_page();
        page.fail_navigation("https://www.youtube.com/watch?v=bad");
        let (transcript, batch) = (fast_transcript(), fast_batch());
        let items = vec![
            BatchItem::from_url("https://www.youtube.com/watch?v=bad"),
            BatchItem::from_url("https://www.youtube.com/watch?v=good"),
        ];

        let summary = BatchRunner::new(&page, &transcript, &batch)
            .run(&items, dir.path(), None)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(dir.path().join("002-talk-good.txt").exists());
    }

    #[tokio::test]
    async fn test_limit_and_write_failure() {
        let dir = TempDir::new().unwrap();
        // A directory where the transcript file should go makes the write fail
        std::fs::create_dir(dir.path().join("001-talk-abc.txt")).unwrap();
        let page = ready_page();
        let (transcript, batch) = (fast_transcript(), fast_batch());
        let items = vec![
            BatchItem::from_url("https://www.youtube.com/watch?v=abc"),
            BatchItem::from_url("https://www.youtube.com/watch?v=def"),
            BatchItem::from_url("https://www.youtube.com/watch?v=ghi"),
        ];

        let summary = BatchRunner::new(&page, &transcript, &batch)
            .run(&items, dir.path(), Some(2))
            .await
            .unwrap();

        assert_eq!(page.navigations().len(), 2);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.to_string(), format!("Transcripts saved: 1/2 → {}", dir.path().display()));
    }
}
