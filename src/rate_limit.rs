//! Download throttling.
//!
//! Publishers such as Springer allow roughly 50 PDF downloads per hour from a
//! single client. [`RateLimiter`] spaces consecutive requests and forces a
//! long pause once the hourly download budget is spent. Resolver lookups are
//! paced too but do not spend budget. It is a plain value owned by the batch
//! loop; waiting happens inline.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Minimum spacing between requests
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Fetch attempts allowed before the forced pause
pub const DOWNLOADS_PER_WINDOW: u32 = 50;

/// Length of the forced pause
pub const WINDOW_PAUSE: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    budget: u32,
    pause: Duration,
    remaining: u32,
    last_request: Option<Instant>,
    pauses: u32,
}

impl RateLimiter {
    /// Create a limiter.
    ///
    /// # Arguments
    ///
    /// * `min_interval` - Minimum time between two attempts
    /// * `budget` - Attempts allowed before a forced pause (0 is treated as 1)
    /// * `pause` - Length of the forced pause
    pub fn new(min_interval: Duration, budget: u32, pause: Duration) -> Self {
        let budget = budget.max(1);
        Self {
            min_interval,
            budget,
            pause,
            remaining: budget,
            last_request: None,
            pauses: 0,
        }
    }

    /// 1 request per second, 50 downloads per hour
    pub fn publisher_policy() -> Self {
        Self::new(MIN_REQUEST_INTERVAL, DOWNLOADS_PER_WINDOW, WINDOW_PAUSE)
    }

    /// Wait until another fetch attempt is allowed, then record it.
    pub async fn acquire(&mut self) {
        if self.remaining == 0 {
            info!(
                budget = self.budget,
                pause_secs = self.pause.as_secs(),
                "Download budget exhausted, pausing"
            );
            tokio::time::sleep(self.pause).await;
            self.remaining = self.budget;
            self.pauses += 1;
        }

        self.pace().await;
        self.remaining -= 1;
    }

    /// Wait out the minimum spacing since the previous request, then record
    /// this one. Does not touch the download budget.
    pub async fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Spacing requests");
                tokio::time::sleep(wait).await;
            }
        }

        self.last_request = Some(Instant::now());
    }

    /// Attempts left before the next forced pause
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Number of forced pauses taken so far
    pub fn pauses(&self) -> u32 {
        self.pauses
    }
}
