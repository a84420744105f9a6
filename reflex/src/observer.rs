//! Read side for front ends: outcome events plus the current standings.
//!
//! An [`Observer`] blocks until the round loop publishes an event, then
//! pairs it with a scoreboard snapshot. Scores are ordered by wins,
//! highest first, with ties kept in registration order.

use std::sync::Arc;

use serde::Serialize;

use crate::player::Player;
use crate::sync::event_channel::{Subscriber, Timeout};

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreLine {
    pub name: String,
    pub wins: u32,
    pub fastest_ms: Option<u64>,
    pub mean_ms: Option<u64>,
    pub slowest_ms: Option<u64>,
}

impl ScoreLine {
    /// Snapshot of `player`, taken under one lock acquisition.
    #[must_use]
    pub fn of(player: &Player) -> Self {
        let stats = player.stats_snapshot();
        Self {
            name: player.name().to_string(),
            wins: stats.wins(),
            fastest_ms: stats.fastest_ms(),
            mean_ms: stats.mean_ms(),
            slowest_ms: stats.slowest_ms(),
        }
    }
}

/// An event with the standings right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub event: String,
    pub scores: Vec<ScoreLine>,
}

impl Status {
    /// Single-line JSON rendering.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` errors, which these plain types never raise
    /// in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Standings of `players`, most wins first; ties keep the given order.
#[must_use]
pub fn scoreboard(players: &[Arc<Player>]) -> Vec<ScoreLine> {
    let mut lines: Vec<ScoreLine> = players.iter().map(|p| ScoreLine::of(p)).collect();
    // `sort_by` is stable.
    lines.sort_by(|a, b| b.wins.cmp(&a.wins));
    lines
}

/// Single consumer of a game's events.
pub struct Observer {
    events: Subscriber<String>,
    players: Vec<Arc<Player>>,
}

impl Observer {
    #[must_use]
    pub fn new(events: Subscriber<String>, players: Vec<Arc<Player>>) -> Self {
        Self { events, players }
    }

    /// Blocks for the next event and returns it with the standings.
    ///
    /// Returns `None` once the game has stopped and every event is drained.
    #[must_use]
    pub fn next_status(&self) -> Option<Status> {
        self.next_status_timeout(Timeout::Infinite)
    }

    /// Like [`next_status`](Self::next_status), giving up after `timeout`.
    #[must_use]
    pub fn next_status_timeout(&self, timeout: impl Into<Timeout>) -> Option<Status> {
        let event = self.events.consume_timeout(timeout)?;
        Some(Status {
            event,
            scores: self.scoreboard(),
        })
    }

    /// Current standings without waiting for an event.
    #[must_use]
    pub fn scoreboard(&self) -> Vec<ScoreLine> {
        scoreboard(&self.players)
    }

    #[must_use]
    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::sync::event_channel;

    fn players(names: &[&str]) -> Vec<Arc<Player>> {
        names.iter().map(|n| Arc::new(Player::new(*n, 1))).collect()
    }

    #[test]
    fn scoreboard_sorts_by_wins_stably() {
        let players = players(&["Black", "Red", "White", "Yellow"]);
        players[1].record_win(Duration::from_millis(300));
        players[3].record_win(Duration::from_millis(250));
        players[3].record_win(Duration::from_millis(350));
        players[2].record_win(Duration::from_millis(400));

        let names: Vec<_> = scoreboard(&players).into_iter().map(|l| l.name).collect();

        assert_eq!(names, vec!["Yellow", "Red", "White", "Black"]);
    }

    #[test]
    fn score_line_without_wins_has_no_times() {
        let players = players(&["A"]);
        let line = &scoreboard(&players)[0];

        assert_eq!(line.wins, 0);
        assert_eq!(line.fastest_ms, None);
        assert_eq!(line.mean_ms, None);
        assert_eq!(line.slowest_ms, None);
    }

    #[test]
    fn status_json_shape() {
        let players = players(&["A", "B"]);
        players[1].record_win(Duration::from_millis(287));
        let status = Status {
            event: "B wins in 287 milliseconds".into(),
            scores: scoreboard(&players),
        };

        let value: serde_json::Value = serde_json::from_str(&status.to_json().unwrap()).unwrap();

        assert_eq!(value["event"], "B wins in 287 milliseconds");
        assert_eq!(value["scores"][0]["name"], "B");
        assert_eq!(value["scores"][0]["wins"], 1);
        assert_eq!(value["scores"][0]["fastest_ms"], 287);
        assert!(value["scores"][1]["fastest_ms"].is_null());
    }

    #[test]
    fn next_status_pairs_event_with_scores() {
        let players = players(&["A"]);
        let (publisher, subscriber) = event_channel::channel();
        let observer = Observer::new(subscriber, players.clone());

        players[0].record_win(Duration::from_millis(123));
        publisher.publish("A wins in 123 milliseconds".to_string());

        let status = observer.next_status().unwrap();
        assert_eq!(status.event, "A wins in 123 milliseconds");
        assert_eq!(status.scores[0].wins, 1);
        assert_eq!(status.scores[0].fastest_ms, Some(123));
    }

    #[test]
    fn next_status_times_out_without_events() {
        let (_publisher, subscriber) = event_channel::channel::<String>();
        let observer = Observer::new(subscriber, players(&["A"]));

        assert!(observer.next_status_timeout(Duration::from_millis(10)).is_none());
    }
}
