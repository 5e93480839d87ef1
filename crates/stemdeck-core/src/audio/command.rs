//! Lock-free command queue from the control thread to the render graph
//!
//! The control thread never touches the render graph directly. Every change
//! (gain units, source arming, source teardown) is pushed as a
//! `RenderCommand` onto an `rtrb` single-producer single-consumer ringbuffer
//! and applied by the audio thread at the start of its next callback.
//!
//! - **No allocations** on the audio side: the ringbuffer is allocated once
//! - **Wait-free** push and pop: the control thread never blocks on audio
//!
//! ```ignore
//! let (tx, rx) = command_channel();
//!
//! // Control thread (non-blocking)
//! tx.push(RenderCommand::StopSource { source });
//!
//! // Audio thread, once per callback
//! graph.process_commands();
//! ```

use basedrop::Shared;

use super::subsystem::{GainId, SourceId};
use crate::types::TrackBuffer;

/// Capacity of the command ringbuffer
///
/// A seek on a five-stem set issues ten commands; 256 leaves room for
/// bursts of transport input between two callbacks.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// A source armed against an absolute output frame
pub struct ScheduledSource {
    pub id: SourceId,
    pub buffer: Shared<TrackBuffer>,
    pub gain: GainId,
    /// Output frame at which the source starts producing audio
    pub start_frame: u64,
    /// Read position (in source frames) at `start_frame`
    pub offset_frames: f64,
}

/// Commands sent from the control thread to the audio thread
pub enum RenderCommand {
    /// Allocate a gain unit slot
    CreateGain { gain: GainId, value: f32 },
    /// Change a gain value, immediately or once `at_frame` is reached
    SetGain {
        gain: GainId,
        value: f32,
        at_frame: Option<u64>,
    },
    /// Free a gain unit slot
    ReleaseGain { gain: GainId },
    /// Arm a buffer source
    StartSource(ScheduledSource),
    /// Tear down a source (no-op if it already played out)
    StopSource { source: SourceId },
}

/// Create the control → audio command channel
pub fn command_channel() -> (rtrb::Producer<RenderCommand>, rtrb::Consumer<RenderCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
