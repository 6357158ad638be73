use std::time::{Duration, Instant};

/// Wall-clock budget for one video's end-to-end processing
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The smaller of `cap` and the time left
    pub fn cap(&self, cap: Duration) -> Duration {
        cap.min(self.remaining())
    }
}
