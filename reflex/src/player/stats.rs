//! Session statistics for one player.
//!
//! Durations are kept at full precision and only converted to whole
//! milliseconds (truncating) when reported.

use std::time::Duration;

/// Converts a duration to whole milliseconds, truncating.
#[inline]
#[must_use]
pub fn to_ms(duration: Duration) -> u64 {
    // Round times are seconds long; u128 -> u64 cannot overflow in practice.
    duration.as_millis() as u64
}

/// Win count plus the elapsed time of every completed round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionStats {
    wins: u32,
    elapsed_times: Vec<Duration>,
}

impl CompletionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Completion times in the order they were recorded.
    #[must_use]
    pub fn elapsed_times(&self) -> &[Duration] {
        &self.elapsed_times
    }

    /// Appends one completion time.
    pub fn record_completion(&mut self, elapsed: Duration) {
        self.elapsed_times.push(elapsed);
    }

    /// Counts a round win and records its completion time.
    pub fn record_win(&mut self, elapsed: Duration) {
        self.wins += 1;
        self.record_completion(elapsed);
    }

    /// Clears wins and completion history.
    pub fn reset(&mut self) {
        self.wins = 0;
        self.elapsed_times.clear();
    }

    /// Fastest completion in ms, `None` with no data.
    #[must_use]
    pub fn fastest_ms(&self) -> Option<u64> {
        self.elapsed_times.iter().min().copied().map(to_ms)
    }

    /// Slowest completion in ms, `None` with no data.
    #[must_use]
    pub fn slowest_ms(&self) -> Option<u64> {
        self.elapsed_times.iter().max().copied().map(to_ms)
    }

    /// Mean completion in ms, `None` with no data.
    #[must_use]
    pub fn mean_ms(&self) -> Option<u64> {
        if self.elapsed_times.is_empty() {
            return None;
        }
        let total: Duration = self.elapsed_times.iter().sum();
        let count = u32::try_from(self.elapsed_times.len()).unwrap_or(u32::MAX);
        Some(to_ms(total / count))
    }
}
