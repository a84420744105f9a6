//! Contestants: identity, raw press log and session statistics.
//!
//! A [`Player`] is shared between the round thread and any number of input
//! callbacks through an `Arc`. Its press log and its statistics each sit
//! behind their own lock; no lock is ever shared between players.

mod press_log;
mod stats;

pub use press_log::{ButtonPress, PressLog};
pub use stats::{CompletionStats, to_ms};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use minstant::Instant;

use crate::trace::trace;

/// One contestant.
#[derive(Debug)]
pub struct Player {
    name: String,
    inputs: usize,
    presses: PressLog,
    stats: Mutex<CompletionStats>,
}

impl Player {
    /// Creates a player with `inputs` buttons.
    #[must_use]
    pub fn new(name: impl Into<String>, inputs: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
            presses: PressLog::new(),
            stats: Mutex::new(CompletionStats::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered inputs. A player with none never takes part in
    /// arbitration.
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    #[must_use]
    pub fn presses(&self) -> &PressLog {
        &self.presses
    }

    /// Records a press of `input` detected now.
    pub fn press(&self, input: usize) {
        self.press_at(input, Instant::now());
    }

    /// Records a press of `input` detected at `time`.
    pub fn press_at(&self, input: usize, time: Instant) {
        self.presses.append(input, time);
        trace!(player = %self.name, input, "pressed");
    }

    /// Whether any press is currently logged.
    #[inline]
    #[must_use]
    pub fn is_pressing(&self) -> bool {
        self.presses.snapshot_has_press()
    }

    pub fn clear_presses(&self) {
        self.presses.clear_all();
    }

    /// Drops presses older than `retention`, returning how many went.
    pub fn prune_presses(&self, retention: Duration, now: Instant) -> usize {
        self.presses.prune_older_than(retention, now)
    }

    pub fn record_completion(&self, elapsed: Duration) {
        self.stats().record_completion(elapsed);
    }

    /// Counts a round win taking `elapsed`.
    pub fn record_win(&self, elapsed: Duration) {
        self.stats().record_win(elapsed);
    }

    /// Clears wins and completion history. The press log is left alone.
    pub fn reset(&self) {
        self.stats().reset();
    }

    #[must_use]
    pub fn wins(&self) -> u32 {
        self.stats().wins()
    }

    #[must_use]
    pub fn fastest_ms(&self) -> Option<u64> {
        self.stats().fastest_ms()
    }

    #[must_use]
    pub fn mean_ms(&self) -> Option<u64> {
        self.stats().mean_ms()
    }

    #[must_use]
    pub fn slowest_ms(&self) -> Option<u64> {
        self.stats().slowest_ms()
    }

    /// Copy of the statistics taken under a single lock acquisition.
    #[must_use]
    pub fn stats_snapshot(&self) -> CompletionStats {
        self.stats().clone()
    }

    fn stats(&self) -> MutexGuard<'_, CompletionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Press entry point for one input of one player.
///
/// Handed to whatever detects raw presses (a GPIO callback, a keyboard
/// reader, a test thread). Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct InputHandle {
    player: Arc<Player>,
    input: usize,
}

impl InputHandle {
    /// Returns a handle for `input`, or `None` if the player has no such input.
    #[must_use]
    pub fn new(player: Arc<Player>, input: usize) -> Option<Self> {
        (input < player.inputs()).then_some(Self { player, input })
    }

    /// Records a press detected now.
    #[inline]
    pub fn press(&self) {
        self.player.press(self.input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_tagged_with_input() {
        let player = Player::new("Red", 2);
        player.press(1);

        let presses = player.presses().snapshot();
        assert_eq!(presses.len(), 1);
        assert_eq!(presses[0].input, 1);
        assert!(player.is_pressing());
    }

    #[test]
    fn test_reset_keeps_press_log() {
        let player = Player::new("Black", 1);
        player.record_win(Duration::from_millis(250));
        player.press(0);

        player.reset();

        assert_eq!(player.wins(), 0);
        assert_eq!(player.fastest_ms(), None);
        assert!(player.stats_snapshot().elapsed_times().is_empty());
        assert!(player.is_pressing(), "reset must not touch raw presses");
    }

    #[test]
    fn test_win_updates_stats() {
        let player = Player::new("A", 1);
        assert_eq!(player.wins(), 0);

        player.record_win(Duration::from_millis(287));

        assert_eq!(player.wins(), 1);
        assert_eq!(player.fastest_ms(), Some(287));
        assert_eq!(player.mean_ms(), Some(287));
        assert_eq!(player.slowest_ms(), Some(287));
    }

    #[test]
    fn test_input_handle_bounds() {
        let player = Arc::new(Player::new("White", 2));

        assert!(InputHandle::new(Arc::clone(&player), 0).is_some());
        assert!(InputHandle::new(Arc::clone(&player), 1).is_some());
        assert!(InputHandle::new(Arc::clone(&player), 2).is_none());

        let silent = Arc::new(Player::new("Nobody", 0));
        assert!(InputHandle::new(silent, 0).is_none());
    }

    #[test]
    fn test_input_handle_presses_from_other_thread() {
        let player = Arc::new(Player::new("Yellow", 1));
        let handle = InputHandle::new(Arc::clone(&player), 0).unwrap();

        std::thread::spawn(move || handle.press()).join().unwrap();

        assert!(player.is_pressing());
        assert_eq!(player.presses().snapshot()[0].input, 0);
    }

    #[test]
    fn test_players_do_not_share_state() {
        let a = Player::new("A", 1);
        let b = Player::new("B", 1);

        a.press(0);
        a.record_win(Duration::from_millis(100));

        assert!(!b.is_pressing());
        assert_eq!(b.wins(), 0);
    }
}
