//! CSV and JSON output for discovered videos
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, ScrapeError};
use crate::listing::{ListingKind, VideoRecord};

pub const CSV_HEADER: &str = "Playlist Index,Title,URL,Channel,Duration,Upload Time,Scraped Date";

/// JSON document written next to the CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingReport {
    pub scraped_date: String,
    pub total_videos: usize,
    pub videos: Vec<VideoRecord>,
}

impl ListingReport {
    pub fn new(videos: Vec<VideoRecord>, scraped_date: String) -> Self {
        Self {
            scraped_date,
            total_videos: videos.len(),
            videos,
        }
    }
}

/// Current time as an ISO-8601 UTC timestamp with milliseconds
pub fn scrape_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// CSV document with title and channel quoted; one timestamp shared by every row
pub fn to_csv(records: &[VideoRecord], scraped_date: &str) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());

    for record in records {
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            record.playlist_index,
            quote(&record.title),
            record.url,
            quote(&record.channel_name),
            record.duration,
            record.upload_time_text,
            scraped_date
        ));
    }

    lines.join("\n")
}

async fn write_file(path: PathBuf, contents: String) -> Result<PathBuf> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| ScrapeError::FileWrite {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Write `{stem}.csv` and `{stem}.json` into `output_dir`. Nothing is written for an empty list.
pub async fn write_listing(
    records: &[VideoRecord],
    kind: ListingKind,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| ScrapeError::FileWrite {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let scraped_date = scrape_timestamp();
    let stem = kind.file_stem();

    let csv_path = write_file(
        output_dir.join(format!("{}.csv", stem)),
        to_csv(records, &scraped_date),
    )
    .await?;
    info!("💾 Saved CSV: {}", csv_path.display());

    let report = ListingReport::new(records.to_vec(), scraped_date);
    let json_path = write_file(
        output_dir.join(format!("{}.json", stem)),
        serde_json::to_string_pretty(&report)?,
    )
    .await?;
    info!("💾 Saved JSON: {}", json_path.display());

    Ok(vec![csv_path, json_path])
}
