//! Offline audio subsystem driven by a manual clock
//!
//! Runs the same render graph as the CPAL backend, but nothing is rendered
//! until the caller advances the clock. Commands are applied as soon as they
//! are issued, so the graph state can be inspected right after a transport
//! call. Used by tests and for rendering without an output device.

use super::command::command_channel;
use super::error::{AudioError, AudioResult};
use super::graph::{FrameClock, GraphController, RenderGraph};
use super::subsystem::{AudioSubsystem, GainId, SourceId, SourceRequest};
use crate::types::{Sample, StereoBuffer, StereoSample};

/// Frames rendered per block while advancing the clock
const BLOCK_FRAMES: usize = 1024;

/// A source start as requested by the caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledStart {
    pub source: SourceId,
    pub gain: GainId,
    pub when: f64,
    pub offset: f64,
}

/// Audio subsystem without an output device
pub struct SimulatedAudio {
    graph: GraphController,
    render: RenderGraph,
    starts: Vec<ScheduledStart>,
    stops: Vec<SourceId>,
    /// Remaining successful source starts before failures are injected
    starts_until_failure: Option<usize>,
    fail_gains: bool,
    fail_stops: bool,
}

impl SimulatedAudio {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let (tx, rx) = command_channel();
        let clock = FrameClock::new();
        Self {
            graph: GraphController::new(tx, clock.clone(), sample_rate),
            render: RenderGraph::new(sample_rate, rx, clock),
            starts: Vec::new(),
            stops: Vec::new(),
            starts_until_failure: None,
            fail_gains: false,
            fail_stops: false,
        }
    }

    /// Advance the clock by rendering (and discarding) `seconds` of audio
    pub fn advance(&mut self, seconds: f64) {
        let frames = (seconds.max(0.0) * self.graph.sample_rate() as f64).round() as usize;
        let mut scratch = vec![StereoSample::silence(); BLOCK_FRAMES.min(frames)];
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(BLOCK_FRAMES);
            self.render.render(&mut scratch[..n]);
            remaining -= n;
        }
    }

    /// Render `frames` of output and return it
    pub fn render(&mut self, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silence(frames);
        for block in out.as_mut_slice().chunks_mut(BLOCK_FRAMES) {
            self.render.render(block);
        }
        out
    }

    /// Every source start issued so far, in call order
    pub fn scheduled_starts(&self) -> &[ScheduledStart] {
        &self.starts
    }

    /// Every source stop issued so far, in call order
    pub fn stopped_sources(&self) -> &[SourceId] {
        &self.stops
    }

    /// Let `n` more source starts succeed, then fail every following one
    pub fn fail_source_starts_after(&mut self, n: usize) {
        self.starts_until_failure = Some(n);
    }

    /// Make gain creation fail (or succeed again)
    pub fn set_gain_creation_fails(&mut self, fail: bool) {
        self.fail_gains = fail;
    }

    /// Reject source stops the way a full command queue does (or stop
    /// rejecting them); rejected sources keep playing
    pub fn set_source_stops_fail(&mut self, fail: bool) {
        self.fail_stops = fail;
    }

    /// Current value of a gain unit inside the render graph
    pub fn current_gain(&self, gain: GainId) -> Option<Sample> {
        self.render.gain_value(gain)
    }

    /// Sources still armed in the render graph
    pub fn active_source_count(&self) -> usize {
        self.render.active_sources()
    }

    fn sync(&mut self) {
        self.render.process_commands();
    }
}

impl AudioSubsystem for SimulatedAudio {
    fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    fn now(&self) -> f64 {
        self.graph.now()
    }

    fn create_gain(&mut self, value: f32) -> AudioResult<GainId> {
        if self.fail_gains {
            return Err(AudioError::ResourceExhausted("gain creation disabled".to_string()));
        }
        let gain = self.graph.create_gain(value)?;
        self.sync();
        Ok(gain)
    }

    fn set_gain(&mut self, gain: GainId, value: f32, at: Option<f64>) -> AudioResult<()> {
        self.graph.set_gain(gain, value, at)?;
        self.sync();
        Ok(())
    }

    fn release_gain(&mut self, gain: GainId) -> AudioResult<()> {
        self.graph.release_gain(gain)?;
        self.sync();
        Ok(())
    }

    fn start_source(&mut self, request: SourceRequest) -> AudioResult<SourceId> {
        match self.starts_until_failure {
            Some(0) => {
                return Err(AudioError::ResourceExhausted(
                    "source start rejected".to_string(),
                ))
            }
            Some(ref mut n) => *n -= 1,
            None => {}
        }

        let (gain, when, offset) = (request.gain, request.when, request.offset);
        let source = self.graph.start_source(request)?;
        self.sync();
        self.starts.push(ScheduledStart {
            source,
            gain,
            when,
            offset,
        });
        Ok(source)
    }

    fn stop_source(&mut self, source: SourceId) -> AudioResult<()> {
        if self.fail_stops {
            return Err(AudioError::QueueFull);
        }
        self.graph.stop_source(source)?;
        self.sync();
        self.stops.push(source);
        Ok(())
    }

    fn is_source_finished(&self, source: SourceId) -> bool {
        self.graph.is_source_finished(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::gc_handle;
    use crate::types::TrackBuffer;
    use basedrop::Shared;

    fn buffer(value: f32, seconds: f64, rate: u32) -> Shared<TrackBuffer> {
        let frames = (seconds * rate as f64) as usize;
        let samples = StereoBuffer::from_vec(vec![StereoSample::mono(value); frames]);
        Shared::new(&gc_handle(), TrackBuffer::new(samples, rate))
    }

    #[test]
    fn test_clock_advances_only_when_rendering() {
        let mut audio = SimulatedAudio::new(1000);
        assert_eq!(audio.now(), 0.0);
        audio.advance(0.25);
        assert!((audio.now() - 0.25).abs() < 1e-9);
        let out = audio.render(500);
        assert_eq!(out.len(), 500);
        assert!((audio.now() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_commands_visible_immediately() {
        let mut audio = SimulatedAudio::new(1000);
        let gain = audio.create_gain(0.0).unwrap();
        assert_eq!(audio.current_gain(gain), Some(0.0));
        audio.set_gain(gain, 1.0, None).unwrap();
        assert_eq!(audio.current_gain(gain), Some(1.0));

        audio
            .start_source(SourceRequest {
                buffer: buffer(0.5, 1.0, 1000),
                gain,
                when: 0.1,
                offset: 0.0,
            })
            .unwrap();
        assert_eq!(audio.active_source_count(), 1);
        assert_eq!(audio.scheduled_starts().len(), 1);
        assert_eq!(audio.scheduled_starts()[0].when, 0.1);
    }

    #[test]
    fn test_source_plays_out() {
        let mut audio = SimulatedAudio::new(1000);
        let gain = audio.create_gain(1.0).unwrap();
        let source = audio
            .start_source(SourceRequest {
                buffer: buffer(0.5, 0.5, 1000),
                gain,
                when: 0.0,
                offset: 0.25,
            })
            .unwrap();

        let out = audio.render(100);
        assert!((out[50].left - 0.5).abs() < 1e-6);
        assert!(!audio.is_source_finished(source));

        audio.advance(0.2);
        assert!(audio.is_source_finished(source));
        assert_eq!(audio.active_source_count(), 0);
        assert!(audio.stop_source(source).is_ok());
    }

    #[test]
    fn test_injected_start_failure() {
        let mut audio = SimulatedAudio::new(1000);
        let gain = audio.create_gain(1.0).unwrap();
        audio.fail_source_starts_after(1);
        let request = SourceRequest {
            buffer: buffer(0.5, 1.0, 1000),
            gain,
            when: 0.0,
            offset: 0.0,
        };
        assert!(audio.start_source(request.clone()).is_ok());
        assert!(matches!(
            audio.start_source(request),
            Err(AudioError::ResourceExhausted(_))
        ));

        audio.set_gain_creation_fails(true);
        assert!(audio.create_gain(1.0).is_err());
    }
}
