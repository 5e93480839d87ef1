//! StemDeck Core - synchronized multi-stem playback engine
//!
//! Plays the tracks of a stem file (drums, bass, other, vocals, master) as
//! one song: every track is scheduled against one shared instant on the
//! audio clock, the position is derived from that clock, and stems are muted
//! through per-track gain units without interrupting playback.
//!
//! ```ignore
//! use stemdeck_core::{EngineConfig, TransportController};
//!
//! let mut transport = TransportController::with_output_device(EngineConfig::default());
//! transport.load_track_set(&std::fs::read("song.stem.mp4")?)?;
//! transport.play()?;
//! transport.set_mute(3, true)?; // vocals off
//! ```

pub mod audio;
pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod gain;
pub mod observer;
pub mod scheduler;
pub mod stems;
pub mod track;
pub mod transport;
pub mod types;
pub mod waveform;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use events::TransportEvent;
pub use observer::{format_time, ObserverStatus, PlayheadFrame, PlayheadObserver};
pub use track::{Track, TrackSet};
pub use transport::TransportController;
pub use types::*;
