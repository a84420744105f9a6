//! Referee configuration.
//!
//! Every timing constant of a round lives in [`GameConfig`], together with
//! the roster and thread placement. Configs come from a preset, are tweaked
//! with the `with_*` setters, or are read from a TOML file in which
//! durations are written as floating-point seconds:
//!
//! ```toml
//! min_wait = 2.0
//! max_wait = 6.0
//! grace_period = 0.06
//! announce_timeouts = true
//!
//! [[players]]
//! name = "Red"
//! inputs = 2
//! ```
//!
//! Keys left out of the file keep their [`GameConfig::default`] value.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placement::CpuConfig;

/// Error loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML or has unknown keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The values are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A contestant as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Display name, unique within the roster.
    pub name: String,
    /// Number of buttons.
    #[serde(default = "PlayerSpec::default_inputs")]
    pub inputs: usize,
}

impl PlayerSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, inputs: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }

    const fn default_inputs() -> usize {
        1
    }
}

/// Timing, roster and placement for a game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Pause between the end of a round and announcing its winners.
    ///
    /// **Default**: 400ms
    pub reveal_delay: Duration,

    /// Shortest random wait before a round is armed.
    ///
    /// **Default**: 1.5s
    pub min_wait: Duration,

    /// Upper bound (exclusive) of the random wait before arming.
    ///
    /// **Default**: 5s
    pub max_wait: Duration,

    /// Window right after the "go" signal in which a press is too fast to be
    /// a human reaction. Pressing in it disqualifies for the round.
    ///
    /// **Default**: 60ms
    pub grace_period: Duration,

    /// How long the judging window stays open before the round times out.
    ///
    /// **Default**: 1s
    pub judging_timeout: Duration,

    /// Lit time of each winner's blink.
    ///
    /// **Default**: 50ms
    pub blink_on: Duration,

    /// Dark time of each winner's blink.
    ///
    /// **Default**: 50ms
    pub blink_off: Duration,

    /// Number of blinks for a winner.
    ///
    /// **Default**: 5
    pub blink_count: u32,

    /// Presses older than this no longer count as "still pressing" when a
    /// round is armed.
    ///
    /// **Default**: 1s
    pub press_retention: Duration,

    /// Publish an event for rounds nobody wins.
    ///
    /// **Default**: false
    pub announce_timeouts: bool,

    /// Seed for the pre-arm wait; `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Placement of the round-loop thread.
    pub cpu: CpuConfig,

    /// Contestants in registration order.
    pub players: Vec<PlayerSpec>,
}

impl GameConfig {
    #[allow(clippy::too_many_arguments)]
    fn new_validated(
        reveal_delay: Duration,
        min_wait: Duration,
        max_wait: Duration,
        grace_period: Duration,
        judging_timeout: Duration,
        blink: Duration,
        blink_count: u32,
        press_retention: Duration,
    ) -> Self {
        assert!(min_wait <= max_wait, "min_wait must be <= max_wait");
        assert!(!judging_timeout.is_zero(), "judging_timeout must be > 0");
        assert!(blink_count > 0, "blink_count must be > 0");

        Self {
            reveal_delay,
            min_wait,
            max_wait,
            grace_period,
            judging_timeout,
            blink_on: blink,
            blink_off: blink,
            blink_count,
            press_retention,
            announce_timeouts: false,
            seed: None,
            cpu: CpuConfig::default(),
            players: Self::default_players(),
        }
    }

    /// Four single-button players: Black, Red, White, Yellow.
    #[must_use]
    pub fn default_players() -> Vec<PlayerSpec> {
        ["Black", "Red", "White", "Yellow"]
            .into_iter()
            .map(|name| PlayerSpec::new(name, 1))
            .collect()
    }

    /// Casual play. Same as [`GameConfig::default`].
    #[must_use]
    pub fn party() -> Self {
        Self::default()
    }

    /// Longer, less predictable waits and a stricter notion of "still
    /// pressing".
    #[must_use]
    pub fn tournament() -> Self {
        Self::new_validated(
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(8),
            Duration::from_millis(80),
            Duration::from_secs(1),
            Duration::from_millis(50),
            8,
            Duration::from_millis(500),
        )
    }

    /// Very short waits for demos and automated runs.
    #[must_use]
    pub fn rapid() -> Self {
        Self::new_validated(
            Duration::ZERO,
            Duration::from_millis(10),
            Duration::from_millis(50),
            Duration::from_millis(10),
            Duration::from_millis(500),
            Duration::from_millis(1),
            1,
            Duration::from_secs(1),
        )
    }

    /// Checks the invariants a round relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_wait > self.max_wait {
            return Err(ConfigError::Invalid(format!(
                "min_wait ({:?}) exceeds max_wait ({:?})",
                self.min_wait, self.max_wait
            )));
        }
        if self.judging_timeout.is_zero() {
            return Err(ConfigError::Invalid("judging_timeout must be > 0".into()));
        }
        if self.blink_count == 0 {
            return Err(ConfigError::Invalid("blink_count must be > 0".into()));
        }
        if self.press_retention.is_zero() {
            return Err(ConfigError::Invalid("press_retention must be > 0".into()));
        }
        if self.players.is_empty() {
            return Err(ConfigError::Invalid("at least one player is required".into()));
        }
        let mut seen = HashSet::new();
        for spec in &self.players {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::Invalid("player names must not be empty".into()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate player name {:?}",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Parses a TOML document on top of the defaults and validates it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] for inconsistent values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let config = file.apply(Self::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new_validated(
            Duration::from_millis(400),
            Duration::from_millis(1500),
            Duration::from_secs(5),
            Duration::from_millis(60),
            Duration::from_secs(1),
            Duration::from_millis(50),
            5,
            Duration::from_secs(1),
        )
    }
}

impl GameConfig {
    #[must_use]
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    /// Sets the range the random pre-arm wait is drawn from.
    #[must_use]
    pub fn with_wait_range(mut self, min_wait: Duration, max_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub fn with_judging_timeout(mut self, timeout: Duration) -> Self {
        self.judging_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_blink(mut self, on: Duration, off: Duration, count: u32) -> Self {
        self.blink_on = on;
        self.blink_off = off;
        self.blink_count = count;
        self
    }

    #[must_use]
    pub fn with_press_retention(mut self, retention: Duration) -> Self {
        self.press_retention = retention;
        self
    }

    #[must_use]
    pub fn with_announce_timeouts(mut self, announce: bool) -> Self {
        self.announce_timeouts = announce;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_cpu(mut self, cpu: CpuConfig) -> Self {
        self.cpu = cpu;
        self
    }

    #[must_use]
    pub fn with_players(mut self, players: Vec<PlayerSpec>) -> Self {
        self.players = players;
        self
    }
}

/// On-disk shape of [`GameConfig`]; every key optional, seconds as floats.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    reveal_delay: Option<f64>,
    min_wait: Option<f64>,
    max_wait: Option<f64>,
    grace_period: Option<f64>,
    judging_timeout: Option<f64>,
    blink_on: Option<f64>,
    blink_off: Option<f64>,
    blink_count: Option<u32>,
    press_retention: Option<f64>,
    announce_timeouts: Option<bool>,
    seed: Option<u64>,
    cpu: Option<CpuConfig>,
    players: Option<Vec<PlayerSpec>>,
}

impl ConfigFile {
    fn apply(self, mut config: GameConfig) -> Result<GameConfig, ConfigError> {
        let durations = [
            ("reveal_delay", self.reveal_delay, &mut config.reveal_delay),
            ("min_wait", self.min_wait, &mut config.min_wait),
            ("max_wait", self.max_wait, &mut config.max_wait),
            ("grace_period", self.grace_period, &mut config.grace_period),
            ("judging_timeout", self.judging_timeout, &mut config.judging_timeout),
            ("blink_on", self.blink_on, &mut config.blink_on),
            ("blink_off", self.blink_off, &mut config.blink_off),
            ("press_retention", self.press_retention, &mut config.press_retention),
        ];
        for (key, seconds, slot) in durations {
            if let Some(seconds) = seconds {
                *slot = seconds_to_duration(key, seconds)?;
            }
        }

        if let Some(count) = self.blink_count {
            config.blink_count = count;
        }
        if let Some(announce) = self.announce_timeouts {
            config.announce_timeouts = announce;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(cpu) = self.cpu {
            config.cpu = cpu;
        }
        if let Some(players) = self.players {
            config.players = players;
        }
        Ok(config)
    }
}

fn seconds_to_duration(key: &str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| ConfigError::Invalid(format!("{key} must be a non-negative number of seconds")))
}
