//! CPAL audio backend
//!
//! Opens one stereo output stream and hands a [`RenderGraph`] to its
//! callback. The control thread keeps the matching [`GraphController`] and
//! talks to the callback through the lock-free command queue only.
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │  Control Thread  │───push()───────────►│   Command Queue     │
//! │ (TransportCtrl)  │                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!         ▲                                           │ pop()
//!         │ Acquire load                              ▼
//! ┌──────────────────┐                     ┌─────────────────────┐
//! │   FrameClock     │◄────────────────────│  CPAL Audio Thread  │
//! │   (AtomicU64)    │   frames rendered   │ (owns RenderGraph)  │
//! └──────────────────┘                     └─────────────────────┘
//! ```

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::command::command_channel;
use super::config::{AudioConfig, BufferSize, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE};
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use super::graph::{FrameClock, GraphController, RenderGraph};
use super::subsystem::{AudioSubsystem, GainId, SourceId, SourceRequest};
use crate::types::StereoSample;

/// Audio subsystem backed by a live CPAL output stream
///
/// Dropping it stops the stream. `cpal::Stream` is not `Send` on every
/// platform, so this type stays on the thread that opened it.
pub struct CpalSubsystem {
    _stream: Stream,
    graph: GraphController,
    device_name: String,
    buffer_size: u32,
}

impl CpalSubsystem {
    /// Open the configured (or default) output device and start the stream
    pub fn open(config: &AudioConfig) -> AudioResult<Self> {
        let device = match &config.device {
            Some(id) => find_device_by_id(id)?,
            None => default_output_device()?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let (supported_config, buffer_size) = get_output_config(&device, config)?;
        let sample_rate = supported_config.sample_rate().0;

        let stream_config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: supported_config.sample_rate(),
            buffer_size: CpalBufferSize::Fixed(buffer_size),
        };

        log::info!(
            "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
            stream_config.channels,
            sample_rate,
            buffer_size,
            (buffer_size as f32 / sample_rate as f32) * 1000.0
        );

        let (command_tx, command_rx) = command_channel();
        let clock = FrameClock::new();
        let render = RenderGraph::new(sample_rate, command_rx, clock.clone());

        let stream = build_output_stream(&device, &stream_config, render)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!("Audio stream started");

        Ok(Self {
            _stream: stream,
            graph: GraphController::new(command_tx, clock, sample_rate),
            device_name,
            buffer_size,
        })
    }

    /// Name of the device the stream was opened on
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Negotiated buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.graph.sample_rate() as f32) * 1000.0
    }
}

impl AudioSubsystem for CpalSubsystem {
    fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    fn now(&self) -> f64 {
        self.graph.now()
    }

    fn create_gain(&mut self, value: f32) -> AudioResult<GainId> {
        self.graph.create_gain(value)
    }

    fn set_gain(&mut self, gain: GainId, value: f32, at: Option<f64>) -> AudioResult<()> {
        self.graph.set_gain(gain, value, at)
    }

    fn release_gain(&mut self, gain: GainId) -> AudioResult<()> {
        self.graph.release_gain(gain)
    }

    fn start_source(&mut self, request: SourceRequest) -> AudioResult<SourceId> {
        self.graph.start_source(request)
    }

    fn stop_source(&mut self, source: SourceId) -> AudioResult<()> {
        self.graph.stop_source(source)
    }

    fn is_source_finished(&self, source: SourceId) -> bool {
        self.graph.is_source_finished(source)
    }
}

/// Get the best output configuration for a device
///
/// Returns (SupportedStreamConfig, buffer_size_in_frames)
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target_sample_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    // The callback writes f32 frames, so only f32 configs are usable
    let best_config = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| {
            target_sample_rate >= c.min_sample_rate().0
                && target_sample_rate <= c.max_sample_rate().0
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 2)
        })
        .or_else(|| {
            supported_configs
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32)
        })
        .ok_or_else(|| {
            AudioError::ConfigError("No f32 output configuration available".to_string())
        })?;

    let sample_rate = if target_sample_rate >= best_config.min_sample_rate().0
        && target_sample_rate <= best_config.max_sample_rate().0
    {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (tracks will be resampled)",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    let buffer_size = match config.buffer_size {
        BufferSize::Default => DEFAULT_BUFFER_SIZE,
        BufferSize::Fixed(frames) => frames.clamp(64, MAX_BUFFER_SIZE as u32),
    };

    log::debug!(
        "Selected output config: {:?}, {} channels, {} frames",
        best_config.sample_format(),
        best_config.channels(),
        buffer_size
    );

    Ok((best_config.clone().with_sample_rate(sample_rate), buffer_size))
}

/// Build the output stream; the callback owns the render graph outright
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut render: RenderGraph,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;
    // Pre-allocated scratch so the callback never allocates
    let mut scratch = vec![StereoSample::silence(); MAX_BUFFER_SIZE];

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                // Devices may hand over more than MAX_BUFFER_SIZE frames at once
                for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
                    let n_frames = chunk.len() / channels;
                    let block = &mut scratch[..n_frames];
                    render.render(block);

                    if channels == 2 {
                        chunk.copy_from_slice(bytemuck::cast_slice(block));
                        continue;
                    }
                    for (frame, sample) in chunk.chunks_mut(channels).zip(block.iter()) {
                        frame[0] = sample.left;
                        if channels > 1 {
                            frame[1] = sample.right;
                        }
                        for ch in frame.iter_mut().skip(2) {
                            *ch = 0.0;
                        }
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
