use std::path::PathBuf;
use std::time::Duration;

/// Result type for scraping and extraction operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Error types for discovery and transcript extraction
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// The page did not reach a ready state in time
    #[error("Navigation to {url} timed out after {}ms", .timeout.as_millis())]
    NavigationTimeout { url: String, timeout: Duration },

    /// Expected UI structure is absent (missing feature or upstream layout change)
    #[error("No element matched {what} (page layout may have changed)")]
    SelectorNotFound { what: String },

    /// Discovery input does not contain a usable video list
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// A browser command failed at the protocol level
    #[error("{action} failed: {reason}")]
    Automation { action: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn selector_not_found(what: impl Into<String>) -> Self {
        Self::SelectorNotFound { what: what.into() }
    }

    pub fn automation(action: &'static str, reason: impl ToString) -> Self {
        Self::Automation {
            action,
            reason: reason.to_string(),
        }
    }

    /// Failures that only concern the current video, not the browser session
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::SelectorNotFound { .. } | Self::FileWrite { .. }
        )
    }
}
