//! Per-player log of raw button presses.
//!
//! Presses are appended from input callbacks (one context per button,
//! outside the referee's control) while the round thread scans, prunes and
//! clears the same log. Every operation takes the log's own lock for the
//! duration of a single `Vec` operation and nothing else.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use minstant::Instant;

/// One raw press of one of a player's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    /// Which of the player's inputs was pressed.
    pub input: usize,
    /// Monotonic time the press was detected.
    pub time: Instant,
}

/// Ordered, internally synchronized log of [`ButtonPress`] events.
#[derive(Debug, Default)]
pub struct PressLog {
    entries: Mutex<Vec<ButtonPress>>,
}

impl PressLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a press. Never rejects.
    #[inline]
    pub fn append(&self, input: usize, time: Instant) {
        self.entries().push(ButtonPress { input, time });
    }

    /// Empties the log.
    pub fn clear_all(&self) {
        self.entries().clear();
    }

    /// Drops every press whose age at `now` is `retention` or more.
    ///
    /// Returns how many presses were removed.
    pub fn prune_older_than(&self, retention: Duration, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|press| now.duration_since(press.time) < retention);
        before - entries.len()
    }

    /// Whether the log holds any press right now.
    #[inline]
    #[must_use]
    pub fn snapshot_has_press(&self) -> bool {
        !self.entries().is_empty()
    }

    /// Copy of the log at this instant, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ButtonPress> {
        self.entries().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    // A callback that panicked mid-push leaves a valid Vec behind, so a
    // poisoned lock is still safe to use.
    fn entries(&self) -> MutexGuard<'_, Vec<ButtonPress>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
