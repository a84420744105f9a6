//! The fixed set of contestants for a game.
//!
//! Built once at startup and never resized. Each [`Seat`] pairs a shared
//! [`Player`] with the indicator the round loop drives for it.

use std::sync::Arc;

use crate::config::PlayerSpec;
use crate::player::{InputHandle, Player};
use crate::signal::SignalSink;

/// A player and their indicator.
pub struct Seat {
    player: Arc<Player>,
    sink: Box<dyn SignalSink>,
}

impl Seat {
    #[must_use]
    pub fn new(player: Arc<Player>, sink: Box<dyn SignalSink>) -> Self {
        Self { player, sink }
    }

    #[must_use]
    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    #[must_use]
    pub fn sink(&self) -> &dyn SignalSink {
        self.sink.as_ref()
    }
}

impl std::fmt::Debug for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seat").field("player", &self.player.name()).finish()
    }
}

/// All seats, in registration order.
#[derive(Debug, Default)]
pub struct Roster {
    seats: Vec<Seat>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one seat per spec, pairing specs and sinks by position.
    ///
    /// Extra sinks are ignored; specs without a sink are not seated.
    #[must_use]
    pub fn from_specs(
        specs: &[PlayerSpec],
        sinks: impl IntoIterator<Item = Box<dyn SignalSink>>,
    ) -> Self {
        let seats = specs
            .iter()
            .zip(sinks)
            .map(|(spec, sink)| Seat::new(Arc::new(Player::new(spec.name.clone(), spec.inputs)), sink))
            .collect();
        Self { seats }
    }

    /// Seats a player and returns their index.
    pub fn push(&mut self, player: Arc<Player>, sink: Box<dyn SignalSink>) -> usize {
        self.seats.push(Seat::new(player, sink));
        self.seats.len() - 1
    }

    #[must_use]
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Shared handles to every player, in registration order.
    #[must_use]
    pub fn players(&self) -> Vec<Arc<Player>> {
        self.seats.iter().map(|seat| Arc::clone(&seat.player)).collect()
    }

    /// Press handle for input `input` of seat `seat`.
    #[must_use]
    pub fn input(&self, seat: usize, input: usize) -> Option<InputHandle> {
        let player = Arc::clone(&self.seats.get(seat)?.player);
        InputHandle::new(player, input)
    }

    pub fn all_on(&self) {
        for seat in &self.seats {
            seat.sink.turn_on();
        }
    }

    pub fn all_off(&self) {
        for seat in &self.seats {
            seat.sink.turn_off();
        }
    }

    pub fn clear_presses(&self) {
        for seat in &self.seats {
            seat.player.clear_presses();
        }
    }

    /// Clears every player's wins and completion history.
    pub fn reset(&self) {
        for seat in &self.seats {
            seat.player.reset();
        }
    }
}
