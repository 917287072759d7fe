//! Re-evaluation throttling: an explicit dirty flag plus one cancellable
//! deadline, owned by the orchestrator and touched only from its own task.
//!
//! Bursts of mutation notifications collapse into a single trailing pass no
//! sooner than the minimum interval after the previous pass completed.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct Throttle {
    min_interval: Duration,
    last_pass: Option<Instant>,
    deadline: Option<Instant>,
    dirty: bool,
}

impl Throttle {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_pass: None,
            deadline: None,
            dirty: false,
        }
    }

    /// Record a mutation notification. Arms the deadline one interval after
    /// the previous pass ended (immediately if none ran yet); an already
    /// armed deadline is left alone so bursts coalesce.
    pub(crate) fn note_mutation(&mut self, now: Instant) {
        self.dirty = true;
        if self.deadline.is_none() {
            let due = self
                .last_pass
                .map_or(now, |end| (end + self.min_interval).max(now));
            self.deadline = Some(due);
        }
    }

    /// Record a completed pass: state is clean and no pass is scheduled.
    pub(crate) fn pass_completed(&mut self, now: Instant) {
        self.last_pass = Some(now);
        self.dirty = false;
        self.deadline = None;
    }

    /// Record a failed pass. The state stays dirty and the deadline re-arms
    /// one interval out, so the retry rides the normal cadence.
    pub(crate) fn pass_failed(&mut self, now: Instant) {
        self.last_pass = Some(now);
        self.deadline = Some(now + self.min_interval);
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }
}
