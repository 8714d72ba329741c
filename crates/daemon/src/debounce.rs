//! Single-shot debounce timer for coalescing settings changes.
//!
//! Rapid slider-style input would otherwise cause a retile per event. The
//! timer is a plain deadline record, independent of any event loop: callers
//! schedule or cancel it and poll `fire_if_due` when their tick arrives.

use std::time::{Duration, Instant};

/// Delay applied to incremental settings changes before retiling.
pub const SETTINGS_RETILE_DELAY: Duration = Duration::from_millis(100);

/// Cancel-and-reschedule single-shot timer.
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop any pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// The armed deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed. Returns true exactly once
    /// per elapsed schedule.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new(SETTINGS_RETILE_DELAY)
    }
}
