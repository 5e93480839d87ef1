//! Audio subsystem for StemDeck
//!
//! Provides the clock, gain units and scheduled buffer sources the transport
//! is built on, with two interchangeable backends:
//!
//! - **CPAL**: a live output stream on the configured device
//! - **Simulated**: the same render graph driven by a manual clock
//!
//! # Architecture
//!
//! The audio system follows a lock-free design for real-time safety:
//!
//! - **Control Thread**: Sends `RenderCommand`s via a lock-free ringbuffer
//! - **Audio Thread**: Owns the `RenderGraph` exclusively, processes commands
//! - **Atomics**: The control thread reads the frame clock via an atomic
//!
//! # Example Usage
//!
//! ```ignore
//! use stemdeck_core::audio::{AudioConfig, AudioSubsystem, CpalSubsystem};
//!
//! let mut audio = CpalSubsystem::open(&AudioConfig::default())?;
//! let gain = audio.create_gain(1.0)?;
//! let when = audio.now() + 0.05;
//! ```

mod command;
mod config;
mod cpal_backend;
mod device;
mod error;
mod gc;
mod graph;
mod simulated;
mod subsystem;

pub use command::{command_channel, RenderCommand, ScheduledSource, COMMAND_QUEUE_CAPACITY};
pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
};
pub use cpal_backend::CpalSubsystem;
pub use device::{default_output_device, find_device_by_id, list_output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
pub use gc::gc_handle;
pub use graph::{
    instant_to_frame, FrameClock, GraphController, RenderGraph, MAX_ACTIVE_SOURCES,
    MAX_GAIN_UNITS,
};
pub use simulated::{ScheduledStart, SimulatedAudio};
pub use subsystem::{AudioSubsystem, GainId, SourceId, SourceRequest};
