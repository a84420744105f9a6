//! Referee for multi-round reaction-time contests.
//!
//! Players are armed after a random wait, the first to press after the
//! "go" signal wins the round, and anyone pressing too early is
//! disqualified for it. Raw presses arrive from independent input contexts
//! through [`InputHandle`]s; outcomes leave through an [`Observer`].
//!
//! ```no_run
//! use reflex::{Game, GameConfig, NullSink, SignalSink};
//!
//! let config = GameConfig::default();
//! let sinks: Vec<Box<dyn SignalSink>> =
//!     config.players.iter().map(|_| Box::new(NullSink) as Box<dyn SignalSink>).collect();
//!
//! let mut game = Game::spawn(config, sinks)?;
//! let red_button = game.input(1, 0).expect("Red has one button");
//! let observer = game.observer().expect("first call");
//!
//! std::thread::spawn(move || red_button.press());
//! if let Some(status) = observer.next_status() {
//!     println!("{}", status.event);
//! }
//! game.shutdown();
//! # Ok::<(), reflex::GameError>(())
//! ```

pub mod arbiter;
pub mod config;
pub mod game;
pub mod observer;
pub mod placement;
pub mod player;
pub mod roster;
pub mod signal;
pub mod sync;
mod trace;

pub use arbiter::{ArbiterState, RoundArbiter, RoundOutcome, RoundResult, SharedState};
pub use config::{ConfigError, GameConfig, PlayerSpec};
pub use game::{Game, GameError, GameLoop};
pub use observer::{Observer, ScoreLine, Status};
pub use placement::CpuConfig;
pub use player::{InputHandle, Player};
pub use roster::{Roster, Seat};
pub use signal::{NullSink, SignalSink};
pub use trace::init_tracing;
