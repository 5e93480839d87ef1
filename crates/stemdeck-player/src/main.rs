//! StemDeck Player - headless multi-stem playback in the terminal
//!
//! This is the main entry point for the player. It:
//! 1. Loads the engine configuration (YAML)
//! 2. Decodes the given stem file and prints its tracks
//! 3. Reads transport commands from stdin on a background thread
//! 4. Drives the playhead observer from a ticker on the main thread
//!
//! The output device is opened on the first `play`.
//!
//! ## Usage
//!
//! ```text
//! stemdeck-player <file> [--config <path>]
//! ```

mod command;
mod display;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use crossbeam::channel::{self, Receiver};

use command::{PlayerCommand, HELP};
use stemdeck_core::audio::CpalSubsystem;
use stemdeck_core::config::{default_config_path, load_config};
use stemdeck_core::{
    EngineConfig, ObserverStatus, PlayheadFrame, PlayheadObserver, TransportController,
    TransportEvent,
};

const CONFIG_FILE: &str = "engine.yaml";

struct Args {
    file: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut file = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                println!("usage: stemdeck-player <file> [--config <path>]\n\n{}", HELP);
                std::process::exit(0);
            }
            _ if file.is_none() => file = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {}", arg),
        }
    }

    Ok(Args {
        file: file.context("usage: stemdeck-player <file> [--config <path>]")?,
        config,
    })
}

/// Forward stdin lines to the main loop; the channel closes on EOF
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = channel::unbounded();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

/// Apply one command; returns false when the player should exit
fn apply(transport: &mut TransportController<CpalSubsystem>, cmd: PlayerCommand) -> bool {
    let result = match cmd {
        PlayerCommand::Play => transport.play(),
        PlayerCommand::Pause => {
            transport.pause();
            Ok(())
        }
        PlayerCommand::Toggle => transport.toggle_play(),
        PlayerCommand::Stop => {
            transport.stop();
            Ok(())
        }
        PlayerCommand::Seek(seconds) => transport.seek(seconds),
        PlayerCommand::Mute(index) => transport.toggle_mute(index).map(|_| ()),
        PlayerCommand::Status => {
            println!(
                "{} {}",
                transport.state(),
                display::playhead_line(&PlayheadFrame {
                    position: transport.position(),
                    duration: transport.duration(),
                    state: transport.state(),
                })
            );
            if let Some(set) = transport.track_set() {
                display::print_tracks(set, transport);
            }
            Ok(())
        }
        PlayerCommand::Help => {
            println!("{}", HELP);
            Ok(())
        }
        PlayerCommand::Quit => return false,
    };

    if let Err(e) = result {
        log::error!("{}", e);
    }
    true
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;

    // Stems decode in parallel; name the pool so it shows up in profilers
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("stemdeck-decode-{}", i))
        .build_global()
    {
        log::warn!("Could not configure decode thread pool: {}", e);
    }

    let config_path = args
        .config
        .unwrap_or_else(|| default_config_path(CONFIG_FILE));
    let config: EngineConfig = load_config(&config_path);

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {:?}", args.file))?;

    let mut transport = TransportController::with_output_device(config.clone());
    let events = transport.subscribe();

    let started = Instant::now();
    let tracks = transport
        .load_track_set(&bytes)
        .with_context(|| format!("Failed to load {:?}", args.file))?
        .len();
    log::info!("Decoded {} tracks in {:.0?}", tracks, started.elapsed());

    println!("{}", args.file.display());
    if let Some(set) = transport.track_set() {
        display::print_tracks(set, &transport);
    }
    println!();
    println!("{}", HELP);

    let mut lines = spawn_stdin_reader()?;
    let mut stdin_open = true;
    let ticker = channel::tick(config.observer_interval());
    let mut observer = PlayheadObserver::from_config(&config, |frame: &PlayheadFrame| {
        print!("\r{}   ", display::playhead_line(frame));
        let _ = std::io::stdout().flush();
    });

    loop {
        crossbeam::select! {
            recv(lines) -> line => match line {
                Ok(line) => match command::parse(&line) {
                    Ok(cmd) => {
                        if !apply(&mut transport, cmd) {
                            break;
                        }
                    }
                    Err(command::ParseError::Empty) => {}
                    Err(e) => eprintln!("{}", e),
                },
                Err(_) => {
                    // Stdin closed: keep playing to the end, then exit
                    stdin_open = false;
                    lines = channel::never();
                    if !transport.is_playing() {
                        break;
                    }
                }
            },
            recv(ticker) -> _ => {
                if observer.poll(&mut transport, Instant::now()) == ObserverStatus::Ended {
                    println!();
                    log::info!("End of track");
                    break;
                }
                if !stdin_open && !transport.is_playing() {
                    break;
                }
            },
        }

        for event in events.try_iter() {
            match event {
                TransportEvent::StateChanged { state, position } => {
                    log::debug!("{} at {:.2}s", state, position)
                }
                TransportEvent::MuteChanged { index, muted } => {
                    println!("\ntrack {} {}", index + 1, if muted { "muted" } else { "unmuted" })
                }
                other => log::debug!("{:?}", other),
            }
        }
    }

    transport.stop();
    Ok(())
}
