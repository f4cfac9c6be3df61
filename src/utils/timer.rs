//! Timer utilities
//!
//! Wall-clock bracketing for groups and examples.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Start/end bracket recorded around a run
#[derive(Clone, Debug, Default)]
pub struct Timing {
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    start: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Timing {
    /// Start (or restart) the timer
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.start = Some(Instant::now());
        self.finished_at = None;
        self.elapsed = None;
    }

    /// Stop the timer; a timer that never started stays empty
    pub fn stop(&mut self) {
        if let Some(start) = self.start {
            self.elapsed = Some(start.elapsed());
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Elapsed time, or zero while running or never started
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_default()
    }

    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
