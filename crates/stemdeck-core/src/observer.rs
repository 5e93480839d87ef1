//! Playhead observer
//!
//! A cooperative polling task for the display loop. Each `poll()` samples
//! the transport position at most once per tick interval, hands it to the
//! renderer callback and stops the transport when the end of the timeline
//! is reached. Stopping at the end is the only change it ever makes to the
//! transport.

use std::time::{Duration, Instant};

use crate::audio::AudioSubsystem;
use crate::config::EngineConfig;
use crate::transport::TransportController;
use crate::types::TransportState;

/// What the renderer needs to draw the playhead
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadFrame {
    pub position: f64,
    pub duration: f64,
    pub state: TransportState,
}

impl PlayheadFrame {
    /// Playhead position as a 0..1 fraction of the timeline
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Outcome of one `poll()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverStatus {
    /// Transport not playing; nothing sampled
    Idle,
    /// Polled again before the tick interval elapsed
    Throttled,
    /// Position sampled and delivered
    Ticked,
    /// End of timeline reached; the transport was stopped
    Ended,
}

/// Rate-limited playhead sampler
pub struct PlayheadObserver<F: FnMut(&PlayheadFrame)> {
    interval: Duration,
    last_tick: Option<Instant>,
    on_frame: F,
}

impl<F: FnMut(&PlayheadFrame)> PlayheadObserver<F> {
    pub fn new(interval: Duration, on_frame: F) -> Self {
        Self {
            interval,
            last_tick: None,
            on_frame,
        }
    }

    /// Observer ticking at the configured rate
    pub fn from_config(config: &EngineConfig, on_frame: F) -> Self {
        Self::new(config.observer_interval(), on_frame)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sample the transport if a tick is due
    pub fn poll<A: AudioSubsystem>(
        &mut self,
        controller: &mut TransportController<A>,
        now: Instant,
    ) -> ObserverStatus {
        if !controller.is_playing() {
            self.last_tick = None;
            return ObserverStatus::Idle;
        }

        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.interval {
                return ObserverStatus::Throttled;
            }
        }
        self.last_tick = Some(now);

        let ended = controller.check_end_of_timeline();
        (self.on_frame)(&PlayheadFrame {
            position: controller.position(),
            duration: controller.duration(),
            state: controller.state(),
        });

        if ended {
            self.last_tick = None;
            ObserverStatus::Ended
        } else {
            ObserverStatus::Ticked
        }
    }
}

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SimulatedAudio;
    use crate::error::EngineResult;
    use crate::stems::{RawStem, StemExtractor};
    use crate::track::tests::FakeDecoder;
    use std::sync::Arc;

    struct OneStem;

    impl StemExtractor for OneStem {
        fn extract(&self, data: &[u8]) -> EngineResult<Vec<RawStem>> {
            Ok(vec![RawStem::new(0, Arc::from(data), None)])
        }
    }

    fn playing(seconds: u8) -> TransportController<SimulatedAudio> {
        let mut transport =
            TransportController::with_audio(EngineConfig::default(), SimulatedAudio::new(1000))
                .with_extractor(OneStem)
                .with_decoder(FakeDecoder { sample_rate: 1000 });
        transport.load_track_set(&[seconds, 0]).unwrap();
        transport.play().unwrap();
        transport
    }

    #[test]
    fn test_idle_when_not_playing() {
        let mut transport = playing(5);
        transport.pause();
        let mut frames = Vec::new();
        let mut observer = PlayheadObserver::new(Duration::ZERO, |f: &PlayheadFrame| frames.push(*f));

        assert_eq!(observer.poll(&mut transport, Instant::now()), ObserverStatus::Idle);
        drop(observer);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_throttled_to_tick_rate() {
        let mut transport = playing(5);
        let mut ticks = 0;
        let mut observer = PlayheadObserver::new(Duration::from_millis(16), |_: &PlayheadFrame| ticks += 1);

        let start = Instant::now();
        assert_eq!(observer.poll(&mut transport, start), ObserverStatus::Ticked);
        assert_eq!(
            observer.poll(&mut transport, start + Duration::from_millis(5)),
            ObserverStatus::Throttled
        );
        assert_eq!(
            observer.poll(&mut transport, start + Duration::from_millis(16)),
            ObserverStatus::Ticked
        );
        drop(observer);
        assert_eq!(ticks, 2);
    }

    #[test]
    fn test_frames_follow_audio_clock() {
        let mut transport = playing(5);
        let mut frames = Vec::new();
        let mut observer = PlayheadObserver::new(Duration::ZERO, |f: &PlayheadFrame| frames.push(*f));

        transport.audio_mut().unwrap().advance(1.05);
        observer.poll(&mut transport, Instant::now());
        drop(observer);

        assert_eq!(frames.len(), 1);
        assert!((frames[0].position - 1.0).abs() < 1e-9);
        assert_eq!(frames[0].duration, 5.0);
        assert!((frames[0].progress() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_stops_at_end_of_timeline() {
        let mut transport = playing(2);
        let mut frames = Vec::new();
        let mut observer = PlayheadObserver::new(Duration::ZERO, |f: &PlayheadFrame| frames.push(*f));

        transport.audio_mut().unwrap().advance(2.1);
        assert_eq!(observer.poll(&mut transport, Instant::now()), ObserverStatus::Ended);
        assert_eq!(observer.poll(&mut transport, Instant::now()), ObserverStatus::Idle);
        drop(observer);

        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position(), 0.0);
        assert_eq!(frames.last().map(|f| f.state), Some(TransportState::Stopped));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(7.9), "0:07");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(600.5), "10:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
