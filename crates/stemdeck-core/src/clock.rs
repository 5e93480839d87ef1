//! Timeline position derived from the audio clock
//!
//! While a session is active the position is computed from the audio clock
//! reading, the instant every source was scheduled at and the timeline
//! offset they started from. It is never accumulated from UI ticks, so it
//! cannot drift from what is actually being rendered.

/// Position bookkeeping for the transport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionClock {
    reference_instant: f64,
    reference_offset: f64,
    active: bool,
    duration: f64,
}

impl PositionClock {
    /// Inactive clock frozen at 0 on a timeline of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            duration: sanitize_duration(duration),
            ..Self::default()
        }
    }

    /// Clamp a timeline position into `[0, duration]`; NaN maps to 0
    pub fn clamp(&self, position: f64) -> f64 {
        if position.is_nan() {
            return 0.0;
        }
        position.clamp(0.0, self.duration)
    }

    /// Begin tracking: the timeline is at `offset` when the clock reads `instant`
    pub fn start(&mut self, instant: f64, offset: f64) {
        self.reference_instant = instant;
        self.reference_offset = self.clamp(offset);
        self.active = true;
    }

    /// Stop tracking and hold `position`
    pub fn freeze(&mut self, position: f64) {
        self.reference_offset = self.clamp(position);
        self.active = false;
    }

    /// Inactive at 0 on a new timeline
    pub fn reset(&mut self, duration: f64) {
        *self = Self::new(duration);
    }

    /// Timeline position at clock reading `now`
    ///
    /// Holds at the start offset until the scheduled instant is reached.
    pub fn position(&self, now: f64) -> f64 {
        if !self.active {
            return self.reference_offset;
        }
        let elapsed = (now - self.reference_instant).max(0.0);
        self.clamp(self.reference_offset + elapsed)
    }

    /// Whether an active clock has run to the end of the timeline
    pub fn has_reached_end(&self, now: f64) -> bool {
        self.active && self.position(now) >= self.duration
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reference_instant(&self) -> f64 {
        self.reference_instant
    }

    /// Frozen position, or the offset the active session started from
    pub fn reference_offset(&self) -> f64 {
        self.reference_offset
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() {
        duration.max(0.0)
    } else {
        0.0
    }
}
