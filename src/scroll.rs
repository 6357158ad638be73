//! Incremental scrolling until lazily-loaded content stops growing
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::browser::{self, Locator, PageDriver, WaitState};
use crate::deadline::Deadline;
use crate::error::{Result, ScrapeError};

/// Window scrolling for listing pages
#[derive(Debug, Clone)]
pub struct PageScrollSettings {
    pub step_px: u32,
    pub poll: Duration,
    /// Consecutive unchanged polls at the bottom that count as fully loaded
    pub stable_polls: u32,
    pub ceiling: Duration,
}

/// Container scrolling for the transcript segment list
#[derive(Debug, Clone)]
pub struct ListScrollSettings {
    pub wait_timeout: Duration,
    pub settle: Duration,
    pub stable_iterations: u32,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Height stopped changing
    Stable,
    /// Iteration or time limit reached while content may still be loading
    Ceiling,
    /// The scrolled container left the document
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub iterations: u32,
    pub final_height: u64,
    pub stop: StopReason,
}

/// Counts consecutive identical height readings
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    last: Option<u64>,
    stable: u32,
    required: u32,
}

impl StabilityTracker {
    pub fn new(required: u32) -> Self {
        Self {
            last: None,
            stable: 0,
            required,
        }
    }

    /// Record a height; true once it has repeated `required` times in a row
    pub fn observe(&mut self, height: u64) -> bool {
        if self.last == Some(height) {
            self.stable += 1;
        } else {
            self.stable = 0;
        }
        self.last = Some(height);
        self.stable >= self.required
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.stable = 0;
    }
}

/// Scroll the window in small steps until the page height holds at the bottom or the ceiling passes
pub async fn scroll_page_to_end<P: PageDriver + ?Sized>(
    page: &P,
    settings: &PageScrollSettings,
) -> Result<ScrollReport> {
    let started = Instant::now();
    let mut tracker = StabilityTracker::new(settings.stable_polls);
    let mut iterations = 0;
    let mut final_height = 0;

    loop {
        let metrics = page.scroll_window_by(settings.step_px).await?;
        iterations += 1;
        final_height = final_height.max(metrics.scroll_height);

        if metrics.at_bottom {
            if tracker.observe(metrics.scroll_height) {
                debug!(
                    "page height settled at {}px after {} polls",
                    metrics.scroll_height, iterations
                );
                return Ok(ScrollReport {
                    iterations,
                    final_height: metrics.scroll_height,
                    stop: StopReason::Stable,
                });
            }
        } else {
            tracker.reset();
        }

        if started.elapsed() >= settings.ceiling {
            warn!(
                "Stopped scrolling after {}ms with the page still growing ({}px)",
                settings.ceiling.as_millis(),
                final_height
            );
            return Ok(ScrollReport {
                iterations,
                final_height,
                stop: StopReason::Ceiling,
            });
        }

        page.pause(settings.poll).await;
    }
}

/// Wait for the segment list, then scroll it until its height stops changing.
///
/// Hitting the iteration limit is not an error: whatever has loaded is still usable.
pub async fn load_full_list<P: PageDriver + ?Sized>(
    page: &P,
    container: &Locator,
    settings: &ListScrollSettings,
    deadline: &Deadline,
) -> Result<ScrollReport> {
    browser::wait_for_any(
        page,
        std::slice::from_ref(container),
        WaitState::Attached,
        deadline.cap(settings.wait_timeout),
        settings.settle,
    )
    .await
    .map_err(|_| ScrapeError::selector_not_found(format!("transcript segment list ({})", container)))?;

    let mut tracker = StabilityTracker::new(settings.stable_iterations);
    let mut final_height = 0;

    for iteration in 1..=settings.max_iterations {
        let height = match page.scroll_container_to_end(container).await? {
            Some(height) => height,
            None => {
                let completed = iteration - 1;
                warn!("Transcript list detached after {} scrolls", completed);
                return Ok(ScrollReport {
                    iterations: completed,
                    final_height,
                    stop: StopReason::Detached,
                });
            }
        };
        final_height = height;

        page.pause(settings.settle).await;

        if tracker.observe(height) {
            info!("📜 Transcript list loaded ({}px, {} scrolls)", height, iteration);
            return Ok(ScrollReport {
                iterations: iteration,
                final_height,
                stop: StopReason::Stable,
            });
        }

        if deadline.is_expired() {
            warn!("Out of time while loading transcript list; using what is loaded");
            return Ok(ScrollReport {
                iterations: iteration,
                final_height,
                stop: StopReason::Ceiling,
            });
        }
    }

    warn!(
        "Transcript list still growing after {} scrolls; using what is loaded",
        settings.max_iterations
    );
    Ok(ScrollReport {
        iterations: settings.max_iterations,
        final_height,
        stop: StopReason::Ceiling,
    })
}
