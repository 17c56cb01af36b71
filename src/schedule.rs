//! Fixed-rate frame scheduling
//!
//! The clock only says when a frame slot has come up. Whether anything is
//! drawn in that slot is decided by the scene's dirty flag, so any number of
//! edits between two slots cost one redraw.

use std::time::{Duration, Instant};

/// Default redraw rate
pub const DEFAULT_REFRESH_HZ: f32 = 30.0;

/// A fixed-interval frame clock
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_HZ)
    }
}

impl FrameClock {
    /// A clock firing `refresh_hz` times per second.
    ///
    /// Non-positive or non-finite rates fall back to [`DEFAULT_REFRESH_HZ`].
    pub fn new(refresh_hz: f32) -> Self {
        let hz = if refresh_hz.is_finite() && refresh_hz > 0.0 { refresh_hz } else { DEFAULT_REFRESH_HZ };
        Self { interval: Duration::from_nanos((1e9 / hz as f64).round() as u64), last: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when a frame slot is due at `now`; the slot is then consumed.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}
