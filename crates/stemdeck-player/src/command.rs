//! Stdin command parsing
//!
//! One command per line. Track numbers are 1-based, matching the track list
//! printed at startup.

use std::fmt;

/// A command typed by the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    /// Play if paused or stopped, pause if playing
    Toggle,
    Stop,
    /// Seek to an absolute position in seconds
    Seek(f64),
    /// Toggle mute of a track (0-based index)
    Mute(usize),
    Status,
    Help,
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidArgument(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Unknown(cmd) => write!(f, "unknown command '{}' (try 'help')", cmd),
            ParseError::MissingArgument(cmd) => write!(f, "'{}' needs an argument", cmd),
            ParseError::InvalidArgument(arg) => write!(f, "invalid argument '{}'", arg),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
commands:
  play | pause | space    start, pause or toggle playback
  stop                    stop and rewind
  seek <seconds>          jump to a position (m:ss also accepted)
  mute <n>                toggle mute of track n
  status                  print position and mute states
  quit                    exit";

/// Parse one input line
pub fn parse(line: &str) -> Result<PlayerCommand, ParseError> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Err(ParseError::Empty);
    };
    let arg = words.next();

    match cmd.to_ascii_lowercase().as_str() {
        "play" | "p" => Ok(PlayerCommand::Play),
        "pause" => Ok(PlayerCommand::Pause),
        "space" | "toggle" => Ok(PlayerCommand::Toggle),
        "stop" | "s" => Ok(PlayerCommand::Stop),
        "seek" => {
            let arg = arg.ok_or(ParseError::MissingArgument("seek"))?;
            parse_time(arg)
                .map(PlayerCommand::Seek)
                .ok_or_else(|| ParseError::InvalidArgument(arg.to_string()))
        }
        "mute" | "m" => {
            let arg = arg.ok_or(ParseError::MissingArgument("mute"))?;
            match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(PlayerCommand::Mute(n - 1)),
                _ => Err(ParseError::InvalidArgument(arg.to_string())),
            }
        }
        "status" | "st" => Ok(PlayerCommand::Status),
        "help" | "?" => Ok(PlayerCommand::Help),
        "quit" | "q" | "exit" => Ok(PlayerCommand::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Parse `12.5` or `1:05` as seconds
fn parse_time(arg: &str) -> Option<f64> {
    let seconds = match arg.split_once(':') {
        Some((minutes, seconds)) => {
            minutes.parse::<u64>().ok()? as f64 * 60.0 + seconds.parse::<f64>().ok()?
        }
        None => arg.parse::<f64>().ok()?,
    };
    seconds.is_finite().then_some(seconds)
}
