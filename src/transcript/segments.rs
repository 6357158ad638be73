//! Reading timestamp/text pairs out of the loaded transcript list
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::{PageDriver, RawSegment, SegmentQuery};
use crate::error::Result;

/// One caption line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Timestamp label as shown ("1:02"), possibly empty
    pub time: String,
    pub text: String,
}

fn segment_query() -> SegmentQuery {
    SegmentQuery {
        segment_selector: "ytd-transcript-segment-list-renderer ytd-transcript-segment-renderer"
            .to_string(),
        time_selectors: ["#segment-timestamp", ".segment-timestamp", "[class*=\"timestamp\"]"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        text_selectors: [
            "#segment-text",
            ".segment-text",
            "yt-formatted-string[force-default-style]",
            "yt-formatted-string",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First candidate that matched, normalized
fn first_match(slots: &[Option<String>]) -> String {
    slots
        .iter()
        .flatten()
        .next()
        .map(|text| normalize_whitespace(text))
        .unwrap_or_default()
}

/// Convert raw segment reads, dropping segments whose text is empty
pub fn segments_from_raw(raw: &[RawSegment]) -> Vec<TranscriptSegment> {
    raw.iter()
        .filter_map(|segment| {
            let text = first_match(&segment.texts);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                time: first_match(&segment.times),
                text,
            })
        })
        .collect()
}

pub async fn extract_segments<P: PageDriver + ?Sized>(page: &P) -> Result<Vec<TranscriptSegment>> {
    let raw = page.collect_segments(&segment_query()).await?;
    let segments = segments_from_raw(&raw);
    debug!("{} segment nodes, {} with text", raw.len(), segments.len());
    Ok(segments)
}

/// Newline-joined transcript; `"{time} {text}"` lines when timestamps are wanted and present
pub fn assemble_transcript(segments: &[TranscriptSegment], include_timestamps: bool) -> String {
    segments
        .iter()
        .map(|segment| {
            if include_timestamps && !segment.time.is_empty() {
                format!("{} {}", segment.time, segment.text)
            } else {
                segment.text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;

    fn segment(time: &str, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            time: time.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello \n\n  world\t "), "hello world");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_first_matching_candidate_wins() {
        let raw = vec![
            RawSegment {
                times: vec![None, Some("\n 0:05 ".to_string()), Some("ignored".to_string())],
                texts: vec![Some("  we begin\n here ".to_string()), Some("ignored".to_string())],
            },
            RawSegment {
                times: vec![None, None, None],
                texts: vec![None, None, None, Some("no timestamp".to_string())],
            },
        ];

        assert_eq!(
            segments_from_raw(&raw),
            vec![segment("0:05", "we begin here"), segment("", "no timestamp")]
        );
    }

    #[test]
    fn test_empty_text_segments_dropped() {
        let raw = vec![
            RawSegment {
                times: vec![Some("0:01".to_string())],
                texts: vec![Some("   ".to_string()), Some("fallback not used".to_string())],
            },
            RawSegment::default(),
        ];
        assert!(segments_from_raw(&raw).is_empty());
    }

    #[test]
    fn test_assemble_with_and_without_timestamps() {
        let segments = vec![segment("0:00", "Hello"), segment("", "there"), segment("0:07", "General")];

        assert_eq!(assemble_transcript(&segments, true), "0:00 Hello\nthere\n0:07 General");
        assert_eq!(assemble_transcript(&segments, false), "Hello\nthere\nGeneral");
        assert_eq!(assemble_transcript(&[], true), "");
    }

    #[tokio::test]
    async fn test_extract_segments_from_page() {
        let page = FakePage::new();
        page.set_segments(vec![RawSegment {
            times: vec![Some("1:02".to_string())],
            texts: vec![Some(" line ".to_string())],
        }]);

        let segments = extract_segments(&page).await.unwrap();
        assert_eq!(segments, vec![segment("1:02", "line")]);
    }
}
