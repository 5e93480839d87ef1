//! Engine error types

use thiserror::Error;

use crate::audio::AudioError;

/// Errors surfaced by the playback engine
///
/// Redundant transport input (play while playing, pause while stopped) is
/// never an error; those calls are no-ops.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A stem could not be decoded; the load was aborted
    #[error("Failed to decode stem {stem}: {reason}")]
    Decode { stem: usize, reason: String },

    /// The container could not be split into stems
    #[error("Failed to extract stems: {0}")]
    Extract(String),

    /// Argument rejected (zero waveform length, unsupported stem count, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Track index outside the loaded set
    #[error("Track index {index} out of range ({count} tracks loaded)")]
    OutOfRange { index: usize, count: usize },

    /// Sources of an earlier session are still playing and could not be stopped
    #[error("{0} source(s) of the previous session could not be stopped")]
    SourcesStillActive(usize),

    /// Failure reported by the audio subsystem
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
