//! Wall-clock timestamps that follow tokio's (possibly paused) time.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Millisecond clock anchored to the Unix epoch at construction.
///
/// Elapsed time is measured with [`tokio::time::Instant`], so tests that
/// pause and advance tokio time see timestamps move with it.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
    epoch_ms: u64,
}

impl Clock {
    /// Anchor a new clock at the current system time.
    #[must_use]
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self::starting_at(epoch_ms)
    }

    /// Anchor a new clock at a fixed timestamp.
    #[must_use]
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }

    /// Current time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
