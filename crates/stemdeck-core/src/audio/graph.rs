//! Render graph: buffer sources mixed through gain units
//!
//! Split in two halves that share nothing but the command queue and the
//! clock atomic:
//!
//! - [`RenderGraph`] lives on the audio thread. It drains commands, mixes
//!   every armed source through its gain unit and advances the frame clock.
//! - [`GraphController`] lives on the control thread. It allocates handles,
//!   converts clock instants to output frames and keeps enough bookkeeping to
//!   answer "has this source finished?" without asking the audio thread.
//!
//! All sources armed with the same `start_frame` and `offset_frames` read
//! their buffers in lockstep, regardless of the order their commands arrived.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::Shared;

use super::command::{RenderCommand, ScheduledSource};
use super::error::{AudioError, AudioResult};
use super::subsystem::{GainId, SourceId, SourceRequest};
use crate::types::{Sample, StereoSample, TrackBuffer};

/// Maximum number of gain units alive at once
pub const MAX_GAIN_UNITS: usize = 64;

/// Maximum number of sources armed at once
pub const MAX_ACTIVE_SOURCES: usize = 256;

/// Monotonic frame clock written by the audio thread, read by the control thread
#[derive(Debug, Default)]
pub struct FrameClock {
    frames: AtomicU64,
}

impl FrameClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Frames rendered so far
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    fn store(&self, frames: u64) {
        self.frames.store(frames, Ordering::Release);
    }
}

/// Convert a clock instant to the nearest output frame
#[inline]
pub fn instant_to_frame(instant: f64, sample_rate: u32) -> u64 {
    (instant.max(0.0) * sample_rate as f64).round() as u64
}

#[derive(Debug, Clone, Copy, Default)]
struct GainSlot {
    live: bool,
    value: Sample,
    /// Value to apply once the output frame reaches the stored frame
    pending: Option<(Sample, u64)>,
}

struct ActiveSource {
    id: SourceId,
    buffer: Shared<TrackBuffer>,
    gain: GainId,
    start_frame: u64,
    offset_frames: f64,
    /// Source frames advanced per output frame (source rate / output rate)
    step: f64,
}

/// Audio-thread half of the graph
pub struct RenderGraph {
    sample_rate: u32,
    gains: Vec<GainSlot>,
    sources: Vec<ActiveSource>,
    commands: rtrb::Consumer<RenderCommand>,
    frame: u64,
    clock: Arc<FrameClock>,
}

impl RenderGraph {
    /// Create the graph; all storage is pre-allocated here
    pub fn new(
        sample_rate: u32,
        commands: rtrb::Consumer<RenderCommand>,
        clock: Arc<FrameClock>,
    ) -> Self {
        Self {
            sample_rate,
            gains: Vec::with_capacity(MAX_GAIN_UNITS),
            sources: Vec::with_capacity(MAX_ACTIVE_SOURCES),
            commands,
            frame: clock.frames(),
            clock,
        }
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of sources still producing (or waiting to produce) audio
    pub fn active_sources(&self) -> usize {
        self.sources.len()
    }

    /// Current value of a gain unit, if it exists
    pub fn gain_value(&self, gain: GainId) -> Option<Sample> {
        self.gains
            .get(gain.0 as usize)
            .filter(|slot| slot.live)
            .map(|slot| slot.value)
    }

    /// Apply all pending commands (real-time safe)
    pub fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::CreateGain { gain, value } => {
                let idx = gain.0 as usize;
                if idx >= MAX_GAIN_UNITS {
                    return;
                }
                if idx >= self.gains.len() {
                    // Within pre-allocated capacity: no allocation
                    self.gains.resize(idx + 1, GainSlot::default());
                }
                self.gains[idx] = GainSlot {
                    live: true,
                    value,
                    pending: None,
                };
            }
            RenderCommand::SetGain { gain, value, at_frame } => {
                if let Some(slot) = self.gains.get_mut(gain.0 as usize) {
                    match at_frame {
                        Some(frame) if frame > self.frame => slot.pending = Some((value, frame)),
                        _ => {
                            slot.value = value;
                            slot.pending = None;
                        }
                    }
                }
            }
            RenderCommand::ReleaseGain { gain } => {
                if let Some(slot) = self.gains.get_mut(gain.0 as usize) {
                    *slot = GainSlot::default();
                }
            }
            RenderCommand::StartSource(scheduled) => {
                if self.sources.len() >= MAX_ACTIVE_SOURCES {
                    // Control side enforces the limit; never grow on this thread
                    return;
                }
                let ScheduledSource {
                    id,
                    buffer,
                    gain,
                    start_frame,
                    offset_frames,
                } = scheduled;
                let step = buffer.sample_rate() as f64 / self.sample_rate as f64;
                self.sources.push(ActiveSource {
                    id,
                    buffer,
                    gain,
                    start_frame,
                    offset_frames,
                    step,
                });
            }
            RenderCommand::StopSource { source } => {
                if let Some(pos) = self.sources.iter().position(|s| s.id == source) {
                    // Dropping the Shared buffer only enqueues it for the collector
                    self.sources.swap_remove(pos);
                }
            }
        }
    }

    /// Render one block: drain commands, mix sources, advance the clock
    pub fn render(&mut self, out: &mut [StereoSample]) {
        self.process_commands();

        out.fill(StereoSample::silence());
        let base = self.frame;
        let has_pending = self.gains.iter().any(|g| g.pending.is_some());

        for (i, frame_out) in out.iter_mut().enumerate() {
            let frame = base + i as u64;

            if has_pending {
                for slot in self.gains.iter_mut() {
                    if let Some((value, at)) = slot.pending {
                        if at <= frame {
                            slot.value = value;
                            slot.pending = None;
                        }
                    }
                }
            }

            for source in &self.sources {
                if frame < source.start_frame {
                    continue;
                }
                let gain = self
                    .gains
                    .get(source.gain.0 as usize)
                    .filter(|slot| slot.live)
                    .map(|slot| slot.value)
                    .unwrap_or(0.0);
                let position =
                    source.offset_frames + (frame - source.start_frame) as f64 * source.step;
                if let Some(sample) = source.buffer.frame_at(position) {
                    *frame_out += sample * gain;
                }
            }
        }

        self.frame = base + out.len() as u64;

        // Drop sources that have played out
        let end_frame = self.frame;
        self.sources.retain(|source| {
            if end_frame <= source.start_frame {
                return true;
            }
            let position =
                source.offset_frames + (end_frame - source.start_frame) as f64 * source.step;
            (position as usize) < source.buffer.len()
        });

        self.clock.store(self.frame);
    }
}

/// Control-thread half of the graph
pub struct GraphController {
    producer: rtrb::Producer<RenderCommand>,
    clock: Arc<FrameClock>,
    sample_rate: u32,
    next_gain: u32,
    free_gains: Vec<GainId>,
    live_gains: Vec<GainId>,
    next_source: u64,
    /// End instant (clock seconds) of every source not yet stopped
    sources: HashMap<SourceId, f64>,
}

impl GraphController {
    pub fn new(
        producer: rtrb::Producer<RenderCommand>,
        clock: Arc<FrameClock>,
        sample_rate: u32,
    ) -> Self {
        Self {
            producer,
            clock,
            sample_rate,
            next_gain: 0,
            free_gains: Vec::new(),
            live_gains: Vec::new(),
            next_source: 0,
            sources: HashMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current clock reading in seconds
    pub fn now(&self) -> f64 {
        self.clock.frames() as f64 / self.sample_rate as f64
    }

    fn send(&mut self, command: RenderCommand) -> AudioResult<()> {
        self.producer.push(command).map_err(|_| AudioError::QueueFull)
    }

    fn check_gain(&self, gain: GainId) -> AudioResult<()> {
        if self.live_gains.contains(&gain) {
            Ok(())
        } else {
            Err(AudioError::UnknownGain(gain))
        }
    }

    pub fn create_gain(&mut self, value: f32) -> AudioResult<GainId> {
        let gain = match self.free_gains.pop() {
            Some(gain) => gain,
            None if (self.next_gain as usize) < MAX_GAIN_UNITS => {
                self.next_gain += 1;
                GainId(self.next_gain - 1)
            }
            None => {
                return Err(AudioError::ResourceExhausted(format!(
                    "all {} gain units in use",
                    MAX_GAIN_UNITS
                )))
            }
        };

        if let Err(e) = self.send(RenderCommand::CreateGain { gain, value }) {
            self.free_gains.push(gain);
            return Err(e);
        }
        self.live_gains.push(gain);
        Ok(gain)
    }

    pub fn set_gain(&mut self, gain: GainId, value: f32, at: Option<f64>) -> AudioResult<()> {
        self.check_gain(gain)?;
        let at_frame = at.map(|instant| instant_to_frame(instant, self.sample_rate));
        self.send(RenderCommand::SetGain { gain, value, at_frame })
    }

    pub fn release_gain(&mut self, gain: GainId) -> AudioResult<()> {
        self.check_gain(gain)?;
        self.send(RenderCommand::ReleaseGain { gain })?;
        self.live_gains.retain(|g| *g != gain);
        self.free_gains.push(gain);
        Ok(())
    }

    pub fn start_source(&mut self, request: SourceRequest) -> AudioResult<SourceId> {
        self.check_gain(request.gain)?;

        let now = self.now();
        self.sources.retain(|_, end| *end > now);
        if self.sources.len() >= MAX_ACTIVE_SOURCES {
            return Err(AudioError::ResourceExhausted(format!(
                "all {} sources in use",
                MAX_ACTIVE_SOURCES
            )));
        }

        let id = SourceId(self.next_source);
        let end_instant = request.end_instant();
        let scheduled = ScheduledSource {
            id,
            offset_frames: request.offset.max(0.0) * request.buffer.sample_rate() as f64,
            start_frame: instant_to_frame(request.when, self.sample_rate),
            buffer: request.buffer,
            gain: request.gain,
        };
        self.send(RenderCommand::StartSource(scheduled))?;

        self.next_source += 1;
        self.sources.insert(id, end_instant);
        Ok(id)
    }

    pub fn stop_source(&mut self, source: SourceId) -> AudioResult<()> {
        let Some(&end_instant) = self.sources.get(&source) else {
            // Already stopped, or played out and pruned
            return if source.0 < self.next_source {
                Ok(())
            } else {
                Err(AudioError::UnknownSource(source))
            };
        };

        if end_instant > self.now() {
            self.send(RenderCommand::StopSource { source })?;
        }
        self.sources.remove(&source);
        Ok(())
    }

    pub fn is_source_finished(&self, source: SourceId) -> bool {
        match self.sources.get(&source) {
            Some(end_instant) => *end_instant <= self.now(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::command::command_channel;
    use crate::audio::gc_handle;
    use crate::types::StereoBuffer;

    fn graph(sample_rate: u32) -> (GraphController, RenderGraph) {
        let (tx, rx) = command_channel();
        let clock = FrameClock::new();
        (
            GraphController::new(tx, clock.clone(), sample_rate),
            RenderGraph::new(sample_rate, rx, clock),
        )
    }

    fn constant(value: f32, frames: usize, rate: u32) -> Shared<TrackBuffer> {
        let samples = vec![StereoSample::mono(value); frames];
        Shared::new(
            &gc_handle(),
            TrackBuffer::new(StereoBuffer::from_vec(samples), rate),
        )
    }

    /// 1 s ramp (0.00, 0.01, ...) on the left or the right channel
    fn ramp(rate: u32, left: bool) -> Shared<TrackBuffer> {
        let samples = (0..rate)
            .map(|i| {
                let v = i as f32 / rate as f32;
                if left {
                    StereoSample::new(v, 0.0)
                } else {
                    StereoSample::new(0.0, v)
                }
            })
            .collect();
        Shared::new(
            &gc_handle(),
            TrackBuffer::new(StereoBuffer::from_vec(samples), rate),
        )
    }

    #[test]
    fn test_source_starts_at_scheduled_frame() {
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();
        ctl.start_source(SourceRequest {
            buffer: constant(0.5, 100, 100),
            gain,
            when: 0.05,
            offset: 0.0,
        })
        .unwrap();

        let mut out = vec![StereoSample::silence(); 10];
        render.render(&mut out);

        // Frames 0..5 silent, 5..10 audible
        assert!(out[..5].iter().all(|s| s.left == 0.0));
        assert!(out[5..].iter().all(|s| (s.left - 0.5).abs() < 1e-6));
        assert_eq!(ctl.now(), 0.1);
    }

    #[test]
    fn test_gain_applies_and_schedules() {
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();
        ctl.start_source(SourceRequest {
            buffer: constant(1.0, 100, 100),
            gain,
            when: 0.0,
            offset: 0.0,
        })
        .unwrap();

        ctl.set_gain(gain, 0.0, None).unwrap();
        ctl.set_gain(gain, 1.0, Some(0.04)).unwrap();

        let mut out = vec![StereoSample::silence(); 8];
        render.render(&mut out);

        assert!(out[..4].iter().all(|s| s.left == 0.0));
        assert!(out[4..].iter().all(|s| s.left == 1.0));
        assert_eq!(render.gain_value(gain), Some(1.0));
    }

    #[test]
    fn test_finished_source_is_pruned_and_stop_tolerated() {
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();
        let source = ctl
            .start_source(SourceRequest {
                buffer: constant(1.0, 5, 100),
                gain,
                when: 0.0,
                offset: 0.0,
            })
            .unwrap();

        let mut out = vec![StereoSample::silence(); 10];
        render.render(&mut out);

        assert_eq!(render.active_sources(), 0);
        assert!(ctl.is_source_finished(source));
        assert!(ctl.stop_source(source).is_ok());
        assert!(ctl.stop_source(source).is_ok());
        assert!(matches!(
            ctl.stop_source(SourceId(99)),
            Err(AudioError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_resampling_step() {
        // 50 Hz source on a 100 Hz graph: every source frame spans two output frames
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();
        let frames = StereoBuffer::from_interleaved(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let buffer = Shared::new(&gc_handle(), TrackBuffer::new(frames, 50));
        ctl.start_source(SourceRequest {
            buffer,
            gain,
            when: 0.0,
            offset: 0.0,
        })
        .unwrap();

        let mut out = vec![StereoSample::silence(); 3];
        render.render(&mut out);
        assert_eq!(out[0].left, 0.0);
        assert!((out[1].left - 0.5).abs() < 1e-6);
        assert_eq!(out[2].left, 1.0);
    }

    #[test]
    fn test_gain_units_are_recycled() {
        let (mut ctl, mut render) = graph(100);
        let gains: Vec<_> = (0..MAX_GAIN_UNITS)
            .map(|_| {
                let g = ctl.create_gain(1.0).unwrap();
                render.process_commands();
                g
            })
            .collect();
        assert!(matches!(
            ctl.create_gain(1.0),
            Err(AudioError::ResourceExhausted(_))
        ));

        ctl.release_gain(gains[3]).unwrap();
        render.process_commands();
        assert_eq!(ctl.create_gain(0.5).unwrap(), gains[3]);
        assert!(matches!(
            ctl.set_gain(GainId(1000), 1.0, None),
            Err(AudioError::UnknownGain(_))
        ));
    }

    #[test]
    fn test_late_start_skips_ahead_in_lockstep() {
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();

        // The clock is already at frame 40 when the starts for frame 25 arrive
        let mut out = vec![StereoSample::silence(); 40];
        render.render(&mut out);
        for left in [true, false] {
            ctl.start_source(SourceRequest {
                buffer: ramp(100, left),
                gain,
                when: 0.25,
                offset: 0.5,
            })
            .unwrap();
        }

        let mut out = vec![StereoSample::silence(); 2];
        render.render(&mut out);

        // Both read source frame 50 + (40 - 25), not 50
        assert_eq!(out[0].left, 65.0 / 100.0);
        assert_eq!(out[0].right, out[0].left);
        assert_eq!(out[1].left, 66.0 / 100.0);
        assert_eq!(out[1].right, out[1].left);
    }

    #[test]
    fn test_stop_rejected_by_full_queue_can_be_retried() {
        let (mut ctl, mut render) = graph(100);
        let gain = ctl.create_gain(1.0).unwrap();
        let source = ctl
            .start_source(SourceRequest {
                buffer: constant(1.0, 1000, 100),
                gain,
                when: 0.0,
                offset: 0.0,
            })
            .unwrap();

        // Audio thread stalled: fill the queue
        while ctl.set_gain(gain, 1.0, None).is_ok() {}
        assert!(matches!(ctl.stop_source(source), Err(AudioError::QueueFull)));
        assert!(!ctl.is_source_finished(source));

        render.process_commands();
        assert_eq!(render.active_sources(), 1);

        ctl.stop_source(source).unwrap();
        render.process_commands();
        assert_eq!(render.active_sources(), 0);
        assert!(ctl.is_source_finished(source));
    }
}
