//! Frame counters and timing
//!
//! # Target Frame Times
//! - 120 FPS (ProMotion): 8.33ms per frame
//! - 60 FPS (standard): 16.67ms per frame

use std::time::{Duration, Instant};

/// Default frame budget for 60 FPS displays (16.67ms)
pub const FRAME_BUDGET_60FPS: Duration = Duration::from_micros(16_667);

/// Frame budget for 120 FPS displays (8.33ms)
pub const FRAME_BUDGET_120FPS: Duration = Duration::from_micros(8_333);

/// Monotonic event counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    count: u64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self) {
        self.increment_by(1);
    }

    pub fn increment_by(&mut self, n: u64) {
        self.count = self.count.saturating_add(n);
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Measures one lap at a time, remembering the last completed lap
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    last_lap: Duration,
    lap_count: u64,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lap. Restarting a running stopwatch discards the open lap.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Finish the open lap and return its duration.
    ///
    /// Stopping an idle stopwatch leaves the last lap untouched.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.last_lap = started.elapsed();
            self.lap_count += 1;
        }
        self.last_lap
    }

    /// Duration of the most recently completed lap
    pub fn last_lap(&self) -> Duration {
        self.last_lap
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Number of completed laps
    pub fn lap_count(&self) -> u64 {
        self.lap_count
    }
}
