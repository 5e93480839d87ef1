//! Audio subsystem error types

use thiserror::Error;

use super::subsystem::{GainId, SourceId};

/// Errors that can occur during audio operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// The command queue to the audio thread is full
    #[error("Audio command queue is full")]
    QueueFull,

    /// The subsystem ran out of sources or gain units
    #[error("Audio resources exhausted: {0}")]
    ResourceExhausted(String),

    /// Gain unit was never created or already released
    #[error("Unknown gain unit {0:?}")]
    UnknownGain(GainId),

    /// Source handle was never issued by this subsystem
    #[error("Unknown source {0:?}")]
    UnknownSource(SourceId),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
