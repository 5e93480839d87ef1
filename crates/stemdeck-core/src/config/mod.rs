//! Engine configuration
//!
//! YAML configuration for the playback engine and the audio backend:
//!
//! - Generic YAML config loading/saving
//! - Default config path under the platform config directory
//! - `EngineConfig` with transport, waveform and observer settings
//!
//! # Usage
//!
//! ```ignore
//! use stemdeck_core::config::{default_config_path, load_config, EngineConfig};
//!
//! let path = default_config_path("engine.yaml");
//! let config: EngineConfig = load_config(&path);
//! ```

mod io;
mod paths;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::waveform::WAVEFORM_LENGTH;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};

/// Configuration of the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lead between "now" and the shared start instant of every source (ms)
    ///
    /// Gives the audio thread time to pick up all start commands before the
    /// first frame of the session is due.
    pub schedule_lead_ms: u32,

    /// Number of peaks computed per track waveform
    pub waveform_length: usize,

    /// Upper bound on playhead observer ticks per second
    pub observer_tick_hz: u32,

    /// Mute the master stem of a multi-stem file on load
    pub mute_master_on_load: bool,

    /// Bound of each event subscriber's queue
    pub event_capacity: usize,

    /// Audio output settings
    pub audio: AudioConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schedule_lead_ms: 50,
            waveform_length: WAVEFORM_LENGTH,
            observer_tick_hz: 60,
            mute_master_on_load: true,
            event_capacity: 64,
            audio: AudioConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Schedule lead in seconds
    pub fn schedule_lead(&self) -> f64 {
        self.schedule_lead_ms as f64 / 1000.0
    }

    /// Minimum interval between two observer ticks
    pub fn observer_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.observer_tick_hz.max(1) as f64)
    }
}
