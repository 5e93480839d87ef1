//! Transport state machine
//!
//! The `TransportController` owns everything a loaded file needs to play:
//! the track set, the gain units, the active session and the position
//! clock. It turns user intents into scheduler and clock operations.
//!
//! # State Machine
//!
//! ```text
//!             play()                      pause()
//!  ┌─────────┐ ──────► ┌─────────┐ ──────────────► ┌────────┐
//!  │ Stopped │         │ Playing │                 │ Paused │
//!  └─────────┘ ◄────── └─────────┘ ◄────────────── └────────┘
//!       ▲       stop()      │          play()           │
//!       └───────────────────┴───────────────────────────┘
//!                          stop()
//! ```
//!
//! Redundant input (play while playing, pause while stopped) is a no-op.
//! `seek()` is valid in every state: while playing it re-arms every source
//! at the target, otherwise it only moves the frozen position.
//!
//! The audio subsystem is opened lazily on the first `play()`, so loading
//! and inspecting files never touches an output device.

use crate::audio::{AudioResult, AudioSubsystem, CpalSubsystem};
use crate::clock::PositionClock;
use crate::config::EngineConfig;
use crate::decode::{AudioDecoder, SymphoniaDecoder};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, TransportEvent};
use crate::gain::GainController;
use crate::scheduler::{PlaybackScheduler, PlaybackSession};
use crate::stems::{StemExtractor, SymphoniaStemExtractor};
use crate::track::TrackSet;
use crate::types::TransportState;

use crossbeam::channel::Receiver;

/// Opens the audio subsystem on first use
pub type AudioOpener<A> = Box<dyn FnMut() -> AudioResult<A>>;

/// Transport controller for one player
pub struct TransportController<A: AudioSubsystem> {
    config: EngineConfig,
    extractor: Box<dyn StemExtractor>,
    decoder: Box<dyn AudioDecoder>,
    opener: Option<AudioOpener<A>>,
    audio: Option<A>,
    track_set: Option<TrackSet>,
    gains: GainController,
    scheduler: PlaybackScheduler,
    clock: PositionClock,
    state: TransportState,
    events: EventBus,
}

impl TransportController<CpalSubsystem> {
    /// Controller that opens the configured output device on first play
    pub fn with_output_device(config: EngineConfig) -> Self {
        let audio_config = config.audio.clone();
        Self::new(config, move || CpalSubsystem::open(&audio_config))
    }
}

impl<A: AudioSubsystem> TransportController<A> {
    /// Controller that opens its audio subsystem with `opener` on first play
    pub fn new(config: EngineConfig, opener: impl FnMut() -> AudioResult<A> + 'static) -> Self {
        let mut controller = Self::bare(config);
        controller.opener = Some(Box::new(opener));
        controller
    }

    /// Controller bound to an already open audio subsystem
    pub fn with_audio(config: EngineConfig, audio: A) -> Self {
        let mut controller = Self::bare(config);
        controller.audio = Some(audio);
        controller
    }

    fn bare(config: EngineConfig) -> Self {
        Self {
            events: EventBus::new(config.event_capacity),
            clock: PositionClock::new(0.0),
            config,
            extractor: Box::new(SymphoniaStemExtractor::new()),
            decoder: Box::new(SymphoniaDecoder::new()),
            opener: None,
            audio: None,
            track_set: None,
            gains: GainController::default(),
            scheduler: PlaybackScheduler::new(),
            state: TransportState::Stopped,
        }
    }

    /// Replace the stem extractor
    pub fn with_extractor(mut self, extractor: impl StemExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the audio decoder
    pub fn with_decoder(mut self, decoder: impl AudioDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Extract, decode and install a new track set
    ///
    /// Decoding happens before anything is touched: on failure the previous
    /// track set and transport state stay as they were. On success playback
    /// is stopped and the new set starts at position 0.
    pub fn load_track_set(&mut self, bytes: &[u8]) -> EngineResult<&TrackSet> {
        let stems = self.extractor.extract(bytes)?;
        let set = TrackSet::decode(
            &stems,
            self.decoder.as_ref(),
            self.config.waveform_length,
            self.config.mute_master_on_load,
        )?;

        let mut gains = GainController::for_track_set(&set);
        if let Some(audio) = self.audio.as_mut() {
            gains.materialize(audio)?;
        }

        self.stop();
        if let Some(audio) = self.audio.as_mut() {
            self.gains.release(audio);
        }
        self.gains = gains;
        self.clock.reset(set.duration());

        log::info!(
            "Loaded {} track(s), duration {:.2}s",
            set.len(),
            set.duration()
        );
        self.events.publish(TransportEvent::TrackSetLoaded {
            tracks: set.len(),
            duration: set.duration(),
        });

        Ok(&*self.track_set.insert(set))
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Start or resume playback from the frozen position
    ///
    /// No-op while playing or with nothing loaded. On failure the transport
    /// stays where it was.
    pub fn play(&mut self) -> EngineResult<()> {
        if self.state == TransportState::Playing || self.track_set.is_none() {
            return Ok(());
        }

        self.ensure_audio()?;
        let offset = self.clock.reference_offset();
        self.start_session(offset)?;

        self.set_state(TransportState::Playing, offset);
        Ok(())
    }

    /// Pause playback, keeping the position; no-op unless playing
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        let position = self.clock.position(self.now());
        self.halt(position);
        self.set_state(TransportState::Paused, position);
    }

    /// Stop playback and rewind to 0
    pub fn stop(&mut self) {
        if self.state == TransportState::Stopped && self.clock.reference_offset() == 0.0 {
            return;
        }
        self.halt(0.0);
        self.set_state(TransportState::Stopped, 0.0);
    }

    /// Toggle between playing and paused
    pub fn toggle_play(&mut self) -> EngineResult<()> {
        if self.state == TransportState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Move the playhead to `target` seconds, clamped to the timeline
    ///
    /// While playing every source is re-armed at the target. If that fails
    /// the transport falls back to paused at the target and the error is
    /// returned.
    pub fn seek(&mut self, target: f64) -> EngineResult<()> {
        let target = self.clock.clamp(target);

        if self.state == TransportState::Playing {
            if let Some(audio) = self.audio.as_mut() {
                self.scheduler.stop_all(audio);
            }
            if let Err(e) = self.start_session(target) {
                log::warn!("Seek to {:.3}s failed while playing: {}", target, e);
                self.clock.freeze(target);
                self.set_state(TransportState::Paused, target);
                self.events.publish(TransportEvent::Seeked { position: target });
                return Err(e);
            }
        } else {
            self.clock.freeze(target);
        }

        log::debug!("Seek to {:.3}s ({})", target, self.state);
        self.events.publish(TransportEvent::Seeked { position: target });
        Ok(())
    }

    /// Stop if playback ran past the end of the timeline
    ///
    /// Returns true when the transport was stopped.
    pub fn check_end_of_timeline(&mut self) -> bool {
        if self.state != TransportState::Playing || !self.clock.has_reached_end(self.now()) {
            return false;
        }
        log::debug!("End of timeline reached");
        self.stop();
        self.events.publish(TransportEvent::EndOfTimeline);
        true
    }

    // ─────────────────────────────────────────────────────────────
    // Mute
    // ─────────────────────────────────────────────────────────────

    /// Mute or unmute a track without touching playback
    pub fn set_mute(&mut self, index: usize, muted: bool) -> EngineResult<()> {
        self.gains.set_mute(self.audio.as_mut(), index, muted)?;
        self.events.publish(TransportEvent::MuteChanged { index, muted });
        Ok(())
    }

    /// Flip a track's mute state; returns the new state
    pub fn toggle_mute(&mut self, index: usize) -> EngineResult<bool> {
        let muted = self.gains.toggle_mute(self.audio.as_mut(), index)?;
        self.events.publish(TransportEvent::MuteChanged { index, muted });
        Ok(muted)
    }

    pub fn is_muted(&self, index: usize) -> EngineResult<bool> {
        self.gains.is_muted(index)
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// Current timeline position in seconds
    pub fn position(&self) -> f64 {
        self.clock.position(self.now())
    }

    /// Timeline length in seconds (0 with nothing loaded)
    pub fn duration(&self) -> f64 {
        self.track_set.as_ref().map_or(0.0, TrackSet::duration)
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Display peaks of a track
    pub fn waveform(&self, index: usize) -> EngineResult<&[u8]> {
        let count = self.track_set.as_ref().map_or(0, TrackSet::len);
        self.track_set
            .as_ref()
            .and_then(|set| set.get(index))
            .map(|track| track.waveform())
            .ok_or(EngineError::OutOfRange { index, count })
    }

    pub fn track_set(&self) -> Option<&TrackSet> {
        self.track_set.as_ref()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.scheduler.session()
    }

    pub fn gains(&self) -> &GainController {
        &self.gains
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The audio subsystem, once opened
    pub fn audio(&self) -> Option<&A> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut A> {
        self.audio.as_mut()
    }

    /// Receive every transport event published from now on
    pub fn subscribe(&mut self) -> Receiver<TransportEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────

    fn now(&self) -> f64 {
        self.audio.as_ref().map_or(0.0, |audio| audio.now())
    }

    /// Open the audio subsystem and create the gain units if needed
    fn ensure_audio(&mut self) -> EngineResult<()> {
        if self.audio.is_none() {
            let opener = self.opener.as_mut().ok_or_else(|| {
                EngineError::InvalidArgument("no audio subsystem configured".to_string())
            })?;
            let audio = opener()?;
            log::info!("Audio subsystem opened at {}Hz", audio.sample_rate());
            self.audio = Some(audio);
        }

        if let Some(audio) = self.audio.as_mut() {
            if !self.gains.is_materialized() {
                self.gains.materialize(audio)?;
            }
        }
        Ok(())
    }

    /// Arm every track at a fresh shared instant, reading from `offset`
    fn start_session(&mut self, offset: f64) -> EngineResult<()> {
        let (Some(audio), Some(set)) = (self.audio.as_mut(), self.track_set.as_ref()) else {
            return Ok(());
        };
        let instant = audio.now() + self.config.schedule_lead();
        self.scheduler
            .start_all(audio, set, &self.gains, instant, offset)?;
        self.clock.start(instant, offset);
        Ok(())
    }

    /// Tear down the session (best effort) and freeze at `position`
    fn halt(&mut self, position: f64) {
        if let Some(audio) = self.audio.as_mut() {
            self.scheduler.stop_all(audio);
        }
        self.clock.freeze(position);
    }

    fn set_state(&mut self, state: TransportState, position: f64) {
        log::debug!("Transport: {} -> {} at {:.3}s", self.state, state, position);
        self.state = state;
        self.events
            .publish(TransportEvent::StateChanged { state, position });
    }
}

impl<A: AudioSubsystem> Drop for TransportController<A> {
    fn drop(&mut self) {
        if let Some(audio) = self.audio.as_mut() {
            self.scheduler.stop_all(audio);
            self.gains.release(audio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioError, SimulatedAudio};
    use crate::stems::RawStem;
    use crate::track::tests::FakeDecoder;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    const RATE: u32 = 1000;
    const LEAD: f64 = 0.05;

    /// Splits the input into `[seconds, fail]` pairs, one per stem
    struct FakeExtractor;

    impl StemExtractor for FakeExtractor {
        fn extract(&self, data: &[u8]) -> EngineResult<Vec<RawStem>> {
            Ok(data
                .chunks(2)
                .enumerate()
                .map(|(i, chunk)| RawStem::new(i, Arc::from(chunk), None))
                .collect())
        }
    }

    /// Container bytes for stems of the given lengths (container order)
    fn container(seconds: &[u8]) -> Vec<u8> {
        seconds.iter().flat_map(|&s| [s, 0]).collect()
    }

    fn controller() -> TransportController<SimulatedAudio> {
        TransportController::with_audio(EngineConfig::default(), SimulatedAudio::new(RATE))
            .with_extractor(FakeExtractor)
            .with_decoder(FakeDecoder { sample_rate: RATE })
    }

    fn loaded(seconds: &[u8]) -> TransportController<SimulatedAudio> {
        let mut transport = controller();
        transport.load_track_set(&container(seconds)).unwrap();
        transport
    }

    fn advance(transport: &mut TransportController<SimulatedAudio>, seconds: f64) {
        transport.audio_mut().unwrap().advance(seconds);
    }

    fn sim(transport: &TransportController<SimulatedAudio>) -> &SimulatedAudio {
        transport.audio().unwrap()
    }

    #[test]
    fn test_scenario_a_position_follows_clock() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        assert_eq!(transport.duration(), 10.0);

        transport.play().unwrap();
        assert!(transport.position() <= LEAD);

        advance(&mut transport, 3.0);
        assert!((transport.position() - 3.0).abs() <= LEAD + 1e-9);
        assert!(transport.is_playing());
    }

    #[test]
    fn test_scenario_b_seek_while_playing() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 1.0);
        let first_session = transport.session().unwrap().id();

        transport.seek(7.5).unwrap();

        assert_eq!(sim(&transport).stopped_sources().len(), 5);
        let session = transport.session().unwrap();
        assert!(session.id() > first_session);
        assert_eq!(session.offset(), 7.5);
        assert_eq!(transport.position(), 7.5);
        assert!(transport.is_playing());
    }

    #[test]
    fn test_scenario_c_end_of_timeline_stops() {
        let mut transport = loaded(&[2, 2, 2, 2, 2]);
        transport.play().unwrap();

        advance(&mut transport, 1.0);
        assert!(!transport.check_end_of_timeline());

        advance(&mut transport, 1.1);
        assert!(transport.check_end_of_timeline());
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position(), 0.0);
        assert!(transport.session().is_none());
    }

    #[test]
    fn test_scenario_d_mismatched_lengths() {
        // Container order: master 10 s, drums 5 s, bass, other, vocals 10 s
        let mut transport = loaded(&[10, 5, 10, 10, 10]);
        assert_eq!(transport.duration(), 10.0);

        transport.play().unwrap();
        let drums = transport.session().unwrap().sources()[0].1;

        advance(&mut transport, 7.0);
        assert!(sim(&transport).is_source_finished(drums));

        transport.pause();
        assert_eq!(transport.state(), TransportState::Paused);
        assert_eq!(sim(&transport).stopped_sources().len(), 5);
        assert!((transport.position() - 6.95).abs() < 1e-9);
    }

    #[test]
    fn test_sync_invariant() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 0.5);
        transport.seek(3.25).unwrap();

        let starts = sim(&transport).scheduled_starts();
        assert_eq!(starts.len(), 10);
        for group in starts.chunks(5) {
            let (when, offset) = (group[0].when.to_bits(), group[0].offset.to_bits());
            assert!(group
                .iter()
                .all(|s| s.when.to_bits() == when && s.offset.to_bits() == offset));
        }
        assert_eq!(starts[5].offset, 3.25);
    }

    #[test]
    fn test_clamp_law() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        for (target, expected) in [(-5.0, 0.0), (0.0, 0.0), (3.3, 3.3), (10.0, 10.0), (25.0, 10.0)] {
            transport.seek(target).unwrap();
            assert_eq!(transport.position(), expected);
        }
        transport.seek(f64::NAN).unwrap();
        assert_eq!(transport.position(), 0.0);

        transport.play().unwrap();
        for (target, expected) in [(-1.0, 0.0), (4.0, 4.0), (99.0, 10.0)] {
            transport.seek(target).unwrap();
            assert_eq!(transport.position(), expected);
        }
    }

    #[test]
    fn test_pause_resume_keeps_position() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 2.05);
        transport.pause();
        let paused_at = transport.position();
        assert!((paused_at - 2.0).abs() < 1e-9);

        advance(&mut transport, 5.0);
        assert_eq!(transport.position(), paused_at);

        transport.play().unwrap();
        assert_eq!(transport.session().unwrap().offset(), paused_at);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 4.0);
        transport.stop();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position(), 0.0);
        assert_eq!(sim(&transport).active_source_count(), 0);
    }

    #[test]
    fn test_no_op_transitions() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        let events = transport.subscribe();

        transport.pause();
        transport.stop();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(events.try_recv().is_err());

        transport.play().unwrap();
        let session = transport.session().unwrap().id();
        transport.play().unwrap();
        assert_eq!(transport.session().unwrap().id(), session);
        assert_eq!(sim(&transport).scheduled_starts().len(), 5);
        assert!(sim(&transport).stopped_sources().is_empty());
    }

    #[test]
    fn test_play_without_tracks_is_noop() {
        let mut transport = controller();
        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.duration(), 0.0);
        assert!(transport.waveform(0).is_err());
    }

    #[test]
    fn test_mute_is_orthogonal_to_playback() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        assert!(transport.is_muted(4).unwrap());

        transport.play().unwrap();
        advance(&mut transport, 1.0);
        let session = transport.session().unwrap().id();
        let position = transport.position();

        let master = transport.gains().gain_id(4).unwrap();
        transport.set_mute(4, false).unwrap();
        assert_eq!(sim(&transport).current_gain(master), Some(1.0));

        assert!(transport.toggle_mute(4).unwrap());
        assert!(!transport.toggle_mute(4).unwrap());
        assert_eq!(sim(&transport).current_gain(master), Some(1.0));

        assert_eq!(transport.session().unwrap().id(), session);
        assert_eq!(transport.position(), position);
        assert!(matches!(
            transport.set_mute(5, true),
            Err(EngineError::OutOfRange { index: 5, count: 5 })
        ));
    }

    #[test]
    fn test_failed_play_rolls_back() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.seek(2.0).unwrap();
        transport.audio_mut().unwrap().fail_source_starts_after(2);

        assert!(transport.play().is_err());
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position(), 2.0);
        assert!(transport.session().is_none());
        assert_eq!(sim(&transport).active_source_count(), 0);
    }

    #[test]
    fn test_failed_seek_falls_back_to_paused() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 1.0);
        transport.audio_mut().unwrap().fail_source_starts_after(0);

        assert!(transport.seek(4.0).is_err());
        assert_eq!(transport.state(), TransportState::Paused);
        assert_eq!(transport.position(), 4.0);
        assert!(transport.session().is_none());
        assert_eq!(sim(&transport).active_source_count(), 0);
    }

    #[test]
    fn test_seek_never_arms_over_unstopped_sources() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 1.0);
        transport.audio_mut().unwrap().set_source_stops_fail(true);

        assert!(matches!(
            transport.seek(7.5),
            Err(EngineError::SourcesStillActive(5))
        ));
        assert_eq!(transport.state(), TransportState::Paused);
        assert_eq!(transport.position(), 7.5);
        assert_eq!(sim(&transport).scheduled_starts().len(), 5);

        transport.audio_mut().unwrap().set_source_stops_fail(false);
        transport.play().unwrap();
        assert_eq!(sim(&transport).stopped_sources().len(), 5);
        assert_eq!(sim(&transport).active_source_count(), 5);
        assert_eq!(transport.session().unwrap().offset(), 7.5);
    }

    #[test]
    fn test_failed_load_keeps_previous_set() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 1.0);

        // Third stem fails to decode
        let bad = [10, 0, 10, 0, 10, 1, 10, 0, 10, 0];
        assert!(matches!(
            transport.load_track_set(&bad),
            Err(EngineError::Decode { stem: 2, .. })
        ));
        assert!(matches!(
            transport.load_track_set(&container(&[1, 1])),
            Err(EngineError::InvalidArgument(_))
        ));

        assert!(transport.is_playing());
        assert_eq!(transport.duration(), 10.0);
        assert_eq!(transport.track_set().unwrap().len(), 5);
    }

    #[test]
    fn test_load_while_playing_replaces_set() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        transport.play().unwrap();
        advance(&mut transport, 3.0);
        let old_gain = transport.gains().gain_id(0).unwrap();

        transport.load_track_set(&container(&[4])).unwrap();

        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position(), 0.0);
        assert_eq!(transport.duration(), 4.0);
        assert_eq!(transport.track_set().unwrap().len(), 1);
        assert!(!transport.is_muted(0).unwrap());
        assert_eq!(sim(&transport).active_source_count(), 0);

        let new_gain = transport.gains().gain_id(0).unwrap();
        assert_ne!(new_gain, old_gain);
        assert_eq!(sim(&transport).current_gain(old_gain), None);
    }

    #[test]
    fn test_audio_opened_lazily() {
        let opened = Rc::new(Cell::new(0));
        let counter = Rc::clone(&opened);
        let mut transport = TransportController::new(EngineConfig::default(), move || {
            counter.set(counter.get() + 1);
            Ok(SimulatedAudio::new(RATE))
        })
        .with_extractor(FakeExtractor)
        .with_decoder(FakeDecoder { sample_rate: RATE });

        transport.load_track_set(&container(&[3])).unwrap();
        assert_eq!(opened.get(), 0);
        assert!(transport.audio().is_none());
        transport.set_mute(0, true).unwrap();

        transport.play().unwrap();
        transport.pause();
        transport.play().unwrap();
        assert_eq!(opened.get(), 1);

        let gain = transport.gains().gain_id(0).unwrap();
        assert_eq!(sim(&transport).current_gain(gain), Some(0.0));
    }

    #[test]
    fn test_failed_open_is_retried() {
        let attempts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&attempts);
        let mut transport = TransportController::new(EngineConfig::default(), move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Err(AudioError::NoDevices)
            } else {
                Ok(SimulatedAudio::new(RATE))
            }
        })
        .with_extractor(FakeExtractor)
        .with_decoder(FakeDecoder { sample_rate: RATE });

        transport.load_track_set(&container(&[3])).unwrap();
        assert!(matches!(
            transport.play(),
            Err(EngineError::Audio(AudioError::NoDevices))
        ));
        assert_eq!(transport.state(), TransportState::Stopped);

        transport.play().unwrap();
        assert!(transport.is_playing());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_events_published() {
        let mut transport = controller();
        let events = transport.subscribe();

        transport.load_track_set(&container(&[10, 10, 10, 10, 10])).unwrap();
        transport.play().unwrap();
        transport.set_mute(0, true).unwrap();
        transport.seek(5.0).unwrap();
        transport.stop();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                TransportEvent::TrackSetLoaded {
                    tracks: 5,
                    duration: 10.0
                },
                TransportEvent::StateChanged {
                    state: TransportState::Playing,
                    position: 0.0
                },
                TransportEvent::MuteChanged {
                    index: 0,
                    muted: true
                },
                TransportEvent::Seeked { position: 5.0 },
                TransportEvent::StateChanged {
                    state: TransportState::Stopped,
                    position: 0.0
                },
            ]
        );
    }

    #[test]
    fn test_toggle_play_and_waveform() {
        let mut transport = loaded(&[10, 10, 10, 10, 10]);
        assert_eq!(transport.waveform(0).unwrap().len(), 1200);

        transport.toggle_play().unwrap();
        assert!(transport.is_playing());
        transport.toggle_play().unwrap();
        assert_eq!(transport.state(), TransportState::Paused);
    }
}
