//! Audio subsystem interface
//!
//! The transport treats the audio subsystem as an opaque collaborator that
//! provides three things:
//!
//! - a monotonic clock (`now()`, seconds)
//! - sample-accurate scheduled start of a buffer source at an absolute
//!   clock instant, reading from an offset within the buffer
//! - continuously adjustable gain units that sources are routed through
//!
//! All calls are fire-and-forget from the control thread's point of view:
//! they enqueue work for the audio thread and never wait on it.

use basedrop::Shared;

use super::error::AudioResult;
use crate::types::TrackBuffer;

/// Handle to a gain unit inside an audio subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GainId(pub u32);

/// Handle to a scheduled buffer source inside an audio subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

/// Everything needed to arm one buffer source
#[derive(Clone)]
pub struct SourceRequest {
    /// Decoded audio the source reads from
    pub buffer: Shared<TrackBuffer>,
    /// Gain unit the source is routed through
    pub gain: GainId,
    /// Absolute audio-clock instant (seconds) at which output begins
    pub when: f64,
    /// Offset within the buffer (seconds) read at `when`
    pub offset: f64,
}

impl std::fmt::Debug for SourceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRequest")
            .field("frames", &self.buffer.len())
            .field("gain", &self.gain)
            .field("when", &self.when)
            .field("offset", &self.offset)
            .finish()
    }
}

impl SourceRequest {
    /// Clock instant at which the source runs out of audio
    ///
    /// A source whose offset is past the end of its buffer ends at `when`.
    pub fn end_instant(&self) -> f64 {
        self.when + (self.buffer.duration() - self.offset).max(0.0)
    }
}

/// The audio subsystem consumed by the scheduler and gain controller
pub trait AudioSubsystem {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Current reading of the monotonic audio clock, in seconds
    fn now(&self) -> f64;

    /// Create a gain unit with an initial value
    fn create_gain(&mut self, value: f32) -> AudioResult<GainId>;

    /// Change a gain unit's value, immediately (`at = None`) or at an
    /// absolute clock instant
    fn set_gain(&mut self, gain: GainId, value: f32, at: Option<f64>) -> AudioResult<()>;

    /// Release a gain unit; sources still routed to it fall silent
    fn release_gain(&mut self, gain: GainId) -> AudioResult<()>;

    /// Arm a buffer source to begin output at `request.when`
    fn start_source(&mut self, request: SourceRequest) -> AudioResult<SourceId>;

    /// Stop and release a source
    ///
    /// Stopping a source that already finished on its own is not an error.
    fn stop_source(&mut self, source: SourceId) -> AudioResult<()>;

    /// Whether a source has played out (or was stopped)
    fn is_source_finished(&self, source: SourceId) -> bool;
}
