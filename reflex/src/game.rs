//! The round loop and the handle that runs it on its own thread.
//!
//! # Round sequence
//!
//! ```text
//! clear presses ─> random wait [min_wait, max_wait) ─> arbiter round
//!      ─> indicators off ─> reveal delay ─> per winner: blink, record, publish
//! ```
//!
//! The loop has no natural end. [`Game`] runs it on a dedicated thread
//! (`reflex-rounds`) and stops it between rounds when shut down; a shutdown
//! during the random wait cuts the wait short.
//!
//! Winners' stats are updated before their event is published, so an
//! observer woken by the event always sees a scoreboard that includes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arbiter::{ArbiterState, RoundArbiter, RoundResult, SharedState};
use crate::config::{ConfigError, GameConfig};
use crate::observer::Observer;
use crate::placement::pin_to_core;
use crate::player::{InputHandle, Player, to_ms};
use crate::roster::Roster;
use crate::signal::SignalSink;
use crate::sync::event_channel::{self, Publisher, Subscriber};
use crate::trace::{debug, info, trace, warn};

/// Event published for a round nobody won, when enabled.
pub const TIMEOUT_EVENT: &str = "Nobody pressed in time";

/// Event text announcing `name` won in `elapsed`.
#[must_use]
pub fn win_event(name: &str, elapsed: Duration) -> String {
    format!("{name} wins in {} milliseconds", to_ms(elapsed))
}

/// Error starting a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The round-loop thread could not be spawned.
    #[error("failed to spawn round thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Drives an unbounded sequence of rounds over a roster.
pub struct GameLoop {
    config: GameConfig,
    arbiter: RoundArbiter,
    roster: Roster,
    events: Publisher<String>,
    rng: StdRng,
    state: SharedState,
    rounds: u64,
    shutdown: Arc<AtomicBool>,
}

impl GameLoop {
    #[must_use]
    pub fn new(config: GameConfig, roster: Roster, events: Publisher<String>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            arbiter: RoundArbiter::from_config(&config),
            config,
            roster,
            events,
            rng,
            state: SharedState::new(),
            rounds: 0,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` to stop [`run`](Self::run) between rounds.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Arbiter state of the round in progress; `Idle` between rounds.
    #[must_use]
    pub fn state(&self) -> ArbiterState {
        self.state.load()
    }

    /// Handle through which other threads follow the round's progress.
    #[must_use]
    pub fn state_handle(&self) -> SharedState {
        self.state.clone()
    }

    /// Rounds completed so far.
    #[must_use]
    pub fn rounds_played(&self) -> u64 {
        self.rounds
    }

    /// Draws the next pre-arm wait uniformly from `[min_wait, max_wait)`.
    pub fn next_wait(&mut self) -> Duration {
        let (min, max) = (self.config.min_wait, self.config.max_wait);
        if max <= min {
            return min;
        }
        Duration::from_secs_f64(self.rng.gen_range(min.as_secs_f64()..max.as_secs_f64()))
    }

    /// Runs rounds until the shutdown flag is set.
    pub fn run(&mut self) {
        info!(players = self.roster.len(), "round loop started");
        while !self.shutdown_requested() {
            if self.play_round().is_none() {
                break;
            }
        }
        self.roster.all_off();
        info!(rounds = self.rounds, "round loop stopped");
    }

    /// Plays one full round, including the random wait before it.
    ///
    /// Returns `None` if shutdown was requested during the wait, in which
    /// case no round was played.
    pub fn play_round(&mut self) -> Option<RoundResult> {
        self.roster.clear_presses();
        let wait = self.next_wait();
        trace!(wait_ms = to_ms(wait), "waiting to arm");
        if !self.pause(wait) {
            return None;
        }

        let result = {
            let state = &self.state;
            self.arbiter.run_observed(self.roster.seats(), |next| {
                trace!(state = ?next, "round state");
                state.store(next);
            })
        };
        self.roster.all_off();

        // Suspense before revealing the winners; not cut short by shutdown.
        thread::sleep(self.config.reveal_delay);
        self.announce(&result);

        self.state.store(ArbiterState::Idle);
        self.rounds += 1;
        Some(result)
    }

    fn announce(&self, result: &RoundResult) {
        if result.is_timed_out() {
            debug!(disqualified = result.disqualified().len(), "round timed out");
            if self.config.announce_timeouts {
                self.events.publish(TIMEOUT_EVENT.to_string());
            }
            return;
        }

        let elapsed = result.elapsed();
        for &index in result.winners() {
            let seat = &self.roster.seats()[index];
            seat.sink().blink(
                self.config.blink_on,
                self.config.blink_off,
                self.config.blink_count,
            );
            let player = seat.player();
            player.record_win(elapsed);
            info!(player = %player.name(), elapsed_ms = to_ms(elapsed), "round won");
            self.events.publish(win_event(player.name(), elapsed));
        }
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    ///
    /// Returns `false` if interrupted by shutdown.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::park_timeout(deadline.duration_since(now));
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Handle to a game running on its own thread.
///
/// Dropping the handle signals shutdown but does not wait for the round
/// thread. Use [`Game::shutdown`] to stop and join.
pub struct Game {
    players: Vec<Arc<Player>>,
    subscriber: Option<Subscriber<String>>,
    shutdown_flag: Arc<AtomicBool>,
    state: SharedState,
    handle: Option<JoinHandle<()>>,
}

impl Game {
    /// Validates `config`, seats one player per sink and starts the round
    /// loop.
    ///
    /// # Errors
    ///
    /// [`GameError::Config`] for an invalid config or a sink count that does
    /// not match the roster, [`GameError::Spawn`] if the thread cannot start.
    pub fn spawn(config: GameConfig, sinks: Vec<Box<dyn SignalSink>>) -> Result<Self, GameError> {
        config.validate()?;
        if sinks.len() != config.players.len() {
            return Err(ConfigError::Invalid(format!(
                "{} players but {} signal sinks",
                config.players.len(),
                sinks.len()
            ))
            .into());
        }

        info!(
            players = config.players.len(),
            min_wait_ms = to_ms(config.min_wait),
            max_wait_ms = to_ms(config.max_wait),
            grace_ms = to_ms(config.grace_period),
            timeout_ms = to_ms(config.judging_timeout),
            "game starting"
        );

        let roster = Roster::from_specs(&config.players, sinks);
        let players = roster.players();
        let (publisher, subscriber) = event_channel::channel();
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let core = config.cpu.resolve();
        let mut game_loop = GameLoop::new(config, roster, publisher)
            .with_shutdown_flag(Arc::clone(&shutdown_flag));
        let state = game_loop.state_handle();

        let handle = thread::Builder::new()
            .name("reflex-rounds".into())
            .spawn(move || {
                if let Some(core) = core {
                    if pin_to_core(core) {
                        info!(core, "round thread pinned");
                    } else {
                        warn!(core, "failed to pin round thread");
                    }
                }
                game_loop.run();
            })
            .map_err(GameError::Spawn)?;

        Ok(Self {
            players,
            subscriber: Some(subscriber),
            shutdown_flag,
            state,
            handle: Some(handle),
        })
    }

    /// Players in registration order.
    #[must_use]
    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    /// Press handle for input `input` of player number `seat`.
    #[must_use]
    pub fn input(&self, seat: usize, input: usize) -> Option<InputHandle> {
        InputHandle::new(Arc::clone(self.players.get(seat)?), input)
    }

    /// Takes the observer. There is only one; later calls return `None`.
    pub fn observer(&mut self) -> Option<Observer> {
        let subscriber = self.subscriber.take()?;
        Some(Observer::new(subscriber, self.players.clone()))
    }

    /// Clears every player's wins and completion history.
    ///
    /// A round in progress and the raw press logs are unaffected.
    pub fn reset(&self) {
        info!("scores reset");
        for player in &self.players {
            player.reset();
        }
    }

    /// Phase of the round in progress, `Idle` during the random wait.
    #[must_use]
    pub fn state(&self) -> ArbiterState {
        self.state.load()
    }

    /// Returns a clone of the shutdown flag for external signal handling.
    ///
    /// Setting it stops the loop at its next check; a random wait in
    /// progress runs out first unless [`Game::shutdown`] is called.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_flag)
    }

    /// Stops the round loop and waits for its thread to exit.
    ///
    /// A round already in progress is finished first.
    pub fn shutdown(mut self) {
        info!("game shutdown initiated");
        self.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!("game shutdown complete");
    }

    fn signal_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
