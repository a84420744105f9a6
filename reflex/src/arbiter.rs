//! Single-round arbitration.
//!
//! A round moves through these states:
//!
//! ```text
//! Idle ─> DisqualifyScan ─> ArmedWait ─> JudgingWindow ─> Resolved
//!              │                │               │
//!      pressing already    "go" signal,   spin-poll until a
//!      => disqualified     grace sleep;   contender presses
//!                          pressing now   or the deadline
//!                          => disqualified passes
//! ```
//!
//! The judging window deliberately busy-polls: a sleep or condition-variable
//! wakeup would add more latency than the measurement can tolerate. The
//! precision floor is one polling pass, and every contender found pressing
//! on the same pass is a co-winner.
//!
//! Reaction times and the judging timeout both run from the end of the
//! grace period, not from the "go" signal. A reported time is therefore
//! `grace_period` shorter than the time since the indicators lit, and a
//! round stays open for `grace_period + judging_timeout` after arming.
//!
//! Any of a player's inputs counts as that player pressing; players with no
//! inputs take no part (never disqualified, never winning).

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use minstant::Instant;

use crate::config::GameConfig;
use crate::roster::Seat;
use crate::trace::debug;

/// Phase of a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ArbiterState {
    /// No round in progress.
    #[default]
    Idle,
    /// Recording who is already pressing.
    DisqualifyScan,
    /// "Go" signal emitted; waiting out the grace period.
    ArmedWait,
    /// Accepting presses and timing them.
    JudgingWindow,
    /// Winners found or timed out.
    Resolved,
}

impl ArbiterState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::DisqualifyScan,
            2 => Self::ArmedWait,
            3 => Self::JudgingWindow,
            4 => Self::Resolved,
            _ => Self::Idle,
        }
    }
}

/// An [`ArbiterState`] that the round thread writes and any thread reads.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<AtomicU8>);

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn load(&self) -> ArbiterState {
        ArbiterState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, state: ArbiterState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Why a seat was excluded from a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisqualifyReason {
    /// Pressed before the "go" signal (or never let go).
    EarlyPress,
    /// Pressed within the grace period, faster than a human can react.
    GracePress,
}

/// A seat excluded from a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disqualification {
    pub seat: usize,
    pub reason: DisqualifyReason,
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Seats seen pressing on the first pass that found any, with the time
    /// from the opening of the judging window.
    Winners { seats: Vec<usize>, elapsed: Duration },
    /// Nobody eligible pressed before the deadline.
    TimedOut,
}

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    outcome: RoundOutcome,
    disqualified: Vec<Disqualification>,
}

impl RoundResult {
    #[must_use]
    pub fn new(outcome: RoundOutcome, disqualified: Vec<Disqualification>) -> Self {
        Self {
            outcome,
            disqualified,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> &RoundOutcome {
        &self.outcome
    }

    /// Winning seat indices; empty on timeout.
    #[must_use]
    pub fn winners(&self) -> &[usize] {
        match &self.outcome {
            RoundOutcome::Winners { seats, .. } => seats,
            RoundOutcome::TimedOut => &[],
        }
    }

    /// Winning time; zero on timeout.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self.outcome {
            RoundOutcome::Winners { elapsed, .. } => elapsed,
            RoundOutcome::TimedOut => Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self.outcome, RoundOutcome::TimedOut)
    }

    #[must_use]
    pub fn disqualified(&self) -> &[Disqualification] {
        &self.disqualified
    }

    #[must_use]
    pub fn is_disqualified(&self, seat: usize) -> bool {
        self.disqualified.iter().any(|d| d.seat == seat)
    }
}

/// Runs rounds over a set of seats.
#[derive(Debug, Clone)]
pub struct RoundArbiter {
    grace_period: Duration,
    judging_timeout: Duration,
    press_retention: Duration,
}

impl RoundArbiter {
    #[must_use]
    pub fn new(grace_period: Duration, judging_timeout: Duration, press_retention: Duration) -> Self {
        Self {
            grace_period,
            judging_timeout,
            press_retention,
        }
    }

    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.grace_period,
            config.judging_timeout,
            config.press_retention,
        )
    }

    /// Runs one round: scan, arm, wait out the grace period, judge.
    ///
    /// Every seat's indicator is turned on as the "go" signal; turning them
    /// back off is left to the caller.
    pub fn run(&self, seats: &[Seat]) -> RoundResult {
        self.run_observed(seats, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_state` on entering each state.
    ///
    /// The callback runs on the round thread between phases; for
    /// [`ArbiterState::JudgingWindow`] it runs after the window has opened
    /// and before the first poll.
    pub fn run_observed(
        &self,
        seats: &[Seat],
        mut on_state: impl FnMut(ArbiterState),
    ) -> RoundResult {
        on_state(ArbiterState::DisqualifyScan);
        let mut disqualified = Vec::new();
        let mut contenders: Vec<usize> = seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.player().inputs() > 0)
            .map(|(index, _)| index)
            .collect();

        let now = Instant::now();
        for &index in &contenders {
            seats[index].player().prune_presses(self.press_retention, now);
        }
        Self::disqualify_pressing(seats, &mut contenders, DisqualifyReason::EarlyPress, &mut disqualified);

        for seat in seats {
            seat.sink().turn_on();
        }
        on_state(ArbiterState::ArmedWait);
        std::thread::sleep(self.grace_period);
        Self::disqualify_pressing(seats, &mut contenders, DisqualifyReason::GracePress, &mut disqualified);

        let window_start = Instant::now();
        let deadline = window_start + self.judging_timeout;
        on_state(ArbiterState::JudgingWindow);

        let outcome = Self::judge(seats, &contenders, window_start, deadline);
        on_state(ArbiterState::Resolved);

        RoundResult::new(outcome, disqualified)
    }

    /// Spin-polls `contenders` until one or more are pressing or `deadline`
    /// passes.
    fn judge(
        seats: &[Seat],
        contenders: &[usize],
        window_start: Instant,
        deadline: Instant,
    ) -> RoundOutcome {
        let mut winners = Vec::with_capacity(contenders.len());
        while Instant::now() < deadline {
            winners.extend(
                contenders
                    .iter()
                    .copied()
                    .filter(|&index| seats[index].player().is_pressing()),
            );
            if !winners.is_empty() {
                let elapsed = Instant::now().duration_since(window_start);
                return RoundOutcome::Winners {
                    seats: winners,
                    elapsed,
                };
            }
            std::hint::spin_loop();
        }
        debug!("judging window timed out");
        RoundOutcome::TimedOut
    }

    fn disqualify_pressing(
        seats: &[Seat],
        contenders: &mut Vec<usize>,
        reason: DisqualifyReason,
        disqualified: &mut Vec<Disqualification>,
    ) {
        contenders.retain(|&seat| {
            let pressing = seats[seat].player().is_pressing();
            if pressing {
                debug!(player = %seats[seat].player().name(), ?reason, "disqualified");
                disqualified.push(Disqualification { seat, reason });
            }
            !pressing
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::player::Player;
    use crate::signal::{NullSink, RecordingSink, Signal};

    fn seats(names: &[&str]) -> Vec<Seat> {
        names
            .iter()
            .map(|name| Seat::new(Arc::new(Player::new(*name, 1)), Box::new(NullSink)))
            .collect()
    }

    fn quick_arbiter() -> RoundArbiter {
        RoundArbiter::new(
            Duration::from_millis(5),
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn timeout_gives_no_winners_and_zero_elapsed() {
        let seats = seats(&["A", "B"]);

        let result = quick_arbiter().run(&seats);

        assert!(result.is_timed_out());
        assert!(result.winners().is_empty());
        assert_eq!(result.elapsed(), Duration::ZERO);
        assert!(result.disqualified().is_empty());
    }

    #[test]
    fn press_in_judging_window_wins() {
        let seats = seats(&["A", "B"]);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                seats[1].player().press(0);
            }
        });

        assert_eq!(result.winners(), &[1]);
        assert!(result.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn early_presser_is_disqualified_and_cannot_win() {
        let seats = seats(&["A", "B"]);
        seats[0].player().press(0);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                // Pressing again in the window changes nothing for A.
                seats[0].player().press(0);
            }
        });

        assert!(result.is_timed_out());
        assert_eq!(
            result.disqualified(),
            &[Disqualification {
                seat: 0,
                reason: DisqualifyReason::EarlyPress
            }]
        );
    }

    #[test]
    fn grace_period_press_disqualifies() {
        let seats = seats(&["A", "B"]);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::ArmedWait {
                seats[0].player().press(0);
            }
        });

        assert!(result.winners().is_empty());
        assert_eq!(
            result.disqualified(),
            &[Disqualification {
                seat: 0,
                reason: DisqualifyReason::GracePress
            }]
        );
    }

    #[test]
    fn same_pass_presses_are_co_winners() {
        let seats = seats(&["A", "B", "C"]);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                seats[0].player().press(0);
                seats[2].player().press(0);
            }
        });

        assert_eq!(result.winners(), &[0, 2]);
        match result.outcome() {
            RoundOutcome::Winners { seats, elapsed } => {
                assert_eq!(seats.len(), 2);
                assert_eq!(*elapsed, result.elapsed());
            }
            RoundOutcome::TimedOut => panic!("expected winners"),
        }
    }

    #[test]
    fn stale_press_outside_retention_is_not_disqualified() {
        let seats = seats(&["A"]);
        let arbiter = RoundArbiter::new(
            Duration::from_millis(5),
            Duration::from_millis(50),
            Duration::from_millis(20),
        );
        seats[0].player().press(0);
        std::thread::sleep(Duration::from_millis(40));

        let result = arbiter.run(&seats);

        assert!(result.disqualified().is_empty());
        assert!(result.is_timed_out());
    }

    #[test]
    fn all_disqualified_still_runs_and_times_out() {
        let seats = seats(&["A", "B"]);
        for seat in &seats {
            seat.player().press(0);
        }
        let mut visited = Vec::new();

        let result = quick_arbiter().run_observed(&seats, |state| visited.push(state));

        assert!(result.is_timed_out());
        assert_eq!(result.disqualified().len(), 2);
        assert_eq!(
            visited,
            vec![
                ArbiterState::DisqualifyScan,
                ArbiterState::ArmedWait,
                ArbiterState::JudgingWindow,
                ArbiterState::Resolved
            ]
        );
    }

    #[test]
    fn player_without_inputs_never_wins_or_is_disqualified() {
        let seats = vec![
            Seat::new(Arc::new(Player::new("Ghost", 0)), Box::new(NullSink)),
            Seat::new(Arc::new(Player::new("A", 1)), Box::new(NullSink)),
        ];
        seats[0].player().press(0);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                seats[1].player().press(0);
            }
        });

        assert!(!result.is_disqualified(0));
        assert_eq!(result.winners(), &[1]);
    }

    #[test]
    fn go_signal_follows_disqualify_scan() {
        let sink = Arc::new(RecordingSink::new());
        let seats = vec![Seat::new(
            Arc::new(Player::new("A", 1)),
            Box::new(Arc::clone(&sink)),
        )];

        quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::DisqualifyScan {
                assert!(sink.signals().is_empty(), "indicator lit before the scan");
            }
        });

        assert_eq!(sink.signals(), vec![Signal::On]);
    }

    #[test]
    fn press_from_another_thread_is_detected() {
        let seats = seats(&["A", "B"]);
        let player = Arc::clone(seats[0].player());
        let arbiter = RoundArbiter::new(
            Duration::from_millis(5),
            Duration::from_secs(2),
            Duration::from_secs(10),
        );

        let result = std::thread::scope(|scope| {
            arbiter.run_observed(&seats, |state| {
                if state == ArbiterState::JudgingWindow {
                    let player = Arc::clone(&player);
                    scope.spawn(move || {
                        std::thread::sleep(Duration::from_millis(30));
                        player.press(0);
                    });
                }
            })
        });

        assert_eq!(result.winners(), &[0]);
        assert!(result.elapsed() >= Duration::from_millis(25));
        assert!(result.elapsed() < Duration::from_secs(2));
    }

    fn two_button_seats() -> Vec<Seat> {
        vec![
            Seat::new(Arc::new(Player::new("A", 2)), Box::new(NullSink)),
            Seat::new(Arc::new(Player::new("B", 1)), Box::new(NullSink)),
        ]
    }

    #[test]
    fn second_button_wins_for_its_player() {
        let seats = two_button_seats();

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                seats[0].player().press(1);
            }
        });

        assert_eq!(result.winners(), &[0]);
        let presses = seats[0].player().presses().snapshot();
        assert_eq!(presses.len(), 1);
        assert_eq!(presses[0].input, 1);
    }

    #[test]
    fn early_press_on_second_button_disqualifies() {
        let seats = two_button_seats();
        seats[0].player().press(1);

        let result = quick_arbiter().run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                // Switching to the first button does not bring A back.
                seats[0].player().press(0);
                seats[1].player().press(0);
            }
        });

        assert_eq!(
            result.disqualified(),
            &[Disqualification {
                seat: 0,
                reason: DisqualifyReason::EarlyPress
            }]
        );
        assert_eq!(result.winners(), &[1]);
        assert_eq!(seats[0].player().presses().snapshot()[0].input, 1);
    }

    #[test]
    fn shared_state_round_trips_every_phase() {
        let shared = SharedState::new();
        assert_eq!(shared.load(), ArbiterState::Idle);

        for state in [
            ArbiterState::DisqualifyScan,
            ArbiterState::ArmedWait,
            ArbiterState::JudgingWindow,
            ArbiterState::Resolved,
            ArbiterState::Idle,
        ] {
            shared.clone().store(state);
            assert_eq!(shared.load(), state);
        }
    }

    #[test]
    fn timing_starts_after_the_grace_period() {
        let seats = seats(&["A"]);
        let grace = Duration::from_millis(80);
        let timeout = Duration::from_millis(40);
        let arbiter = RoundArbiter::new(grace, timeout, Duration::from_secs(10));

        let result = arbiter.run_observed(&seats, |state| {
            if state == ArbiterState::JudgingWindow {
                seats[0].player().press(0);
            }
        });
        assert_eq!(result.winners(), &[0]);
        assert!(result.elapsed() < grace, "{:?}", result.elapsed());

        seats[0].player().clear_presses();
        let started = Instant::now();
        assert!(arbiter.run(&seats).is_timed_out());
        assert!(started.elapsed() >= grace + timeout);
    }
}
