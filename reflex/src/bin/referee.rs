//! Console front end for the reaction-time referee.
//!
//! Indicators are printed to stderr, outcomes are printed to stdout as one
//! JSON object per line, and presses are read from stdin:
//!
//! ```text
//! 2        player 2 presses button 1
//! 3.2      player 3 presses button 2
//! reset    clear every score
//! quit     stop (as do EOF, Ctrl-C and SIGTERM)
//! ```
//!
//! # Usage
//!
//! ```sh
//! referee --config game.toml --announce-timeouts
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel::{RecvTimeoutError, Sender};

use reflex::{CpuConfig, Game, GameConfig, GameError, SignalSink};

/// How often the command loop checks for a shutdown signal.
const COMMAND_POLL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "referee", about = "Multi-round reaction-time contest referee")]
struct Cli {
    /// TOML config file (defaults are used for missing keys)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Seed for the random wait before each round
    #[arg(long)]
    seed: Option<u64>,

    /// Publish an event when nobody presses in time
    #[arg(long)]
    announce_timeouts: bool,

    /// Pin the round thread to this core
    #[arg(long, conflicts_with = "no_pin")]
    pin_core: Option<usize>,

    /// Never pin the round thread
    #[arg(long)]
    no_pin: bool,
}

/// Indicator that narrates to stderr.
struct ConsoleSink {
    name: String,
}

impl SignalSink for ConsoleSink {
    fn turn_on(&self) {
        eprintln!("[{}] on", self.name);
    }

    fn turn_off(&self) {
        eprintln!("[{}] off", self.name);
    }

    fn blink(&self, on: Duration, off: Duration, count: u32) {
        eprintln!(
            "[{}] blink x{count} ({}ms on / {}ms off)",
            self.name,
            on.as_millis(),
            off.as_millis()
        );
    }
}

/// One parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Zero-based seat and input.
    Press { seat: usize, input: usize },
    Reset,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" => None,
        "reset" => Some(Command::Reset),
        "quit" | "exit" => Some(Command::Quit),
        press => {
            let (seat, input) = match press.split_once('.') {
                Some((seat, input)) => (seat, input),
                None => (press, "1"),
            };
            let seat: usize = seat.parse().ok()?;
            let input: usize = input.parse().ok()?;
            Some(Command::Press {
                seat: seat.checked_sub(1)?,
                input: input.checked_sub(1)?,
            })
        }
    }
}

/// Reads stdin until EOF or `quit`, forwarding every recognised command.
fn read_commands(commands: &Sender<Command>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(command) => {
                let quit = command == Command::Quit;
                if commands.send(command).is_err() || quit {
                    break;
                }
            }
            None => eprintln!("referee: unrecognised input: {}", line.trim()),
        }
    }
}

fn main() {
    reflex::init_tracing();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("referee: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), GameError> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if cli.announce_timeouts {
        config = config.with_announce_timeouts(true);
    }
    if let Some(core) = cli.pin_core {
        config = config.with_cpu(CpuConfig::Pinned(core));
    } else if cli.no_pin {
        config = config.with_cpu(CpuConfig::Disabled);
    }

    let sinks: Vec<Box<dyn SignalSink>> = config
        .players
        .iter()
        .map(|spec| {
            Box::new(ConsoleSink {
                name: spec.name.clone(),
            }) as Box<dyn SignalSink>
        })
        .collect();

    for (number, spec) in config.players.iter().enumerate() {
        eprintln!("referee: player {} is {} ({} button(s))", number + 1, spec.name, spec.inputs);
    }

    let mut game = Game::spawn(config, sinks)?;
    let observer_handle = game
        .observer()
        .map(|observer| {
            thread::Builder::new()
                .name("reflex-observer".into())
                .spawn(move || {
                    while let Some(status) = observer.next_status() {
                        match status.to_json() {
                            Ok(line) => println!("{line}"),
                            Err(e) => eprintln!("referee: failed to encode status: {e}"),
                        }
                    }
                })
        })
        .transpose()
        .map_err(GameError::Spawn)?;

    // Ctrl-C and SIGTERM stop the game the same way `quit` does.
    let shutdown = game.shutdown_flag();
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown));

    let (command_tx, command_rx) = crossbeam::channel::unbounded::<Command>();
    thread::Builder::new()
        .name("reflex-stdin".into())
        .spawn(move || read_commands(&command_tx))
        .map_err(GameError::Spawn)?;

    eprintln!("referee: ready");

    while !shutdown.load(Ordering::Relaxed) {
        match command_rx.recv_timeout(COMMAND_POLL) {
            Ok(Command::Press { seat, input }) => match game.input(seat, input) {
                Some(handle) => handle.press(),
                None => eprintln!("referee: no such button: {}.{}", seat + 1, input + 1),
            },
            Ok(Command::Reset) => game.reset(),
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    eprintln!("referee: shutting down...");
    game.shutdown();
    // The round thread owned the only publisher, so the observer drains and exits.
    if let Some(handle) = observer_handle {
        let _ = handle.join();
    }
    eprintln!("referee: stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_presses_as_zero_based() {
        assert_eq!(parse_command("2"), Some(Command::Press { seat: 1, input: 0 }));
        assert_eq!(parse_command(" 3.2 "), Some(Command::Press { seat: 2, input: 1 }));
    }

    #[test]
    fn parses_keywords() {
        assert_eq!(parse_command("reset"), Some(Command::Reset));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("red"), None);
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("1.0"), None);
    }
}
