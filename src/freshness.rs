//! Recency filter over the platform's relative upload labels ("3 days ago")
use regex::Regex;
use tracing::debug;

use crate::listing::VideoRecord;

/// Label used when a listing page does not expose upload time
pub const UNKNOWN_UPLOAD_TIME: &str = "N/A";

/// Decide whether a relative upload label falls within `threshold_days`.
///
/// Rules are checked in order, so "1 day 2 hours ago" matches the hour rule.
/// Missing labels are kept; month/year labels and anything unrecognised are dropped.
pub fn is_within_threshold(upload_time_text: &str, threshold_days: i64) -> bool {
    let text = upload_time_text.trim().to_lowercase();

    if text.is_empty() || text == UNKNOWN_UPLOAD_TIME.to_lowercase() {
        return true;
    }

    if text.contains("second") || text.contains("minute") || text.contains("hour") {
        return true;
    }

    if text.contains("day") {
        if let Some(days_ago) = leading_count(&text, "day") {
            return days_ago <= threshold_days;
        }
    }

    if text.contains("week") {
        if let Some(weeks_ago) = leading_count(&text, "week") {
            return weeks_ago.saturating_mul(7) <= threshold_days;
        }
    }

    if text.contains("month") || text.contains("year") {
        return false;
    }

    false
}

/// Keep records uploaded within `threshold_days`; a non-positive threshold keeps everything
pub fn retain_fresh(records: Vec<VideoRecord>, threshold_days: i64) -> Vec<VideoRecord> {
    if threshold_days <= 0 {
        return records;
    }

    let before = records.len();
    let kept: Vec<VideoRecord> = records
        .into_iter()
        .filter(|record| is_within_threshold(&record.upload_time_text, threshold_days))
        .collect();

    debug!(
        "Freshness filter ({} days) kept {}/{} videos",
        threshold_days,
        kept.len(),
        before
    );
    kept
}

/// Parse the integer directly preceding `unit`, e.g. 12 in "12 days ago"
fn leading_count(text: &str, unit: &str) -> Option<i64> {
    let pattern = format!(r"(\d+)\s*{}", regex::escape(unit));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}
