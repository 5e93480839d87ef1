//! Common types for StemDeck
//!
//! Fundamental audio types shared by the decoder, the render graph and the
//! transport: stereo sample buffers, decoded track buffers, stem roles and
//! the transport state.

use std::ops::Index;

/// Audio sample type (32-bit float throughout)
pub type Sample = f32;

/// Number of stems in a stem file (Drums, Bass, Other, Vocals, Master)
pub const NUM_STEMS: usize = 5;

/// Role of a track within a loaded set
///
/// Display order is Drums, Bass, Other, Vocals, Master. A plain
/// (non-stem) file loads as a single `Mix` track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StemRole {
    Drums,
    Bass,
    Other,
    Vocals,
    Master,
    Mix,
}

impl StemRole {
    /// Stem roles in display order
    pub const DISPLAY_ORDER: [StemRole; NUM_STEMS] = [
        StemRole::Drums,
        StemRole::Bass,
        StemRole::Other,
        StemRole::Vocals,
        StemRole::Master,
    ];

    /// Get the display name of this role
    pub fn name(&self) -> &'static str {
        match self {
            StemRole::Drums => "Drums",
            StemRole::Bass => "Bass",
            StemRole::Other => "Other",
            StemRole::Vocals => "Vocals",
            StemRole::Master => "Master",
            StemRole::Mix => "Audio",
        }
    }
}

impl std::fmt::Display for StemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single stereo sample (left and right channels)
///
/// `#[repr(C)]` keeps the layout `[left, right]` so a slice of samples can
/// be viewed as interleaved `f32` without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Linear interpolation between two samples
    #[inline]
    pub fn lerp(&self, other: &Self, t: Sample) -> Self {
        Self {
            left: self.left + (other.left - self.left) * t,
            right: self.right + (other.right - self.right) * t,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// A buffer of stereo samples
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from interleaved samples `[L, R, L, R, ...]`
    ///
    /// A trailing odd sample is dropped.
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        let samples = interleaved
            .chunks_exact(2)
            .map(|chunk| StereoSample::new(chunk[0], chunk[1]))
            .collect();
        Self { samples }
    }

    /// Create a buffer from interleaved samples with any channel count
    ///
    /// Mono is duplicated into both channels; channels beyond the second
    /// are discarded.
    pub fn from_multichannel(interleaved: &[Sample], channels: usize) -> Self {
        match channels {
            0 => Self::default(),
            1 => Self {
                samples: interleaved.iter().map(|&s| StereoSample::mono(s)).collect(),
            },
            2 => Self::from_interleaved(interleaved),
            n => Self {
                samples: interleaved
                    .chunks_exact(n)
                    .map(|frame| StereoSample::new(frame[0], frame[1]))
                    .collect(),
            },
        }
    }

    /// Create a buffer from an existing Vec of StereoSamples
    pub fn from_vec(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    /// Get the number of stereo samples in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get a mutable slice of the samples
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Get an iterator over the samples
    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

/// A fully decoded track: stereo frames at a fixed sample rate
#[derive(Debug, Clone)]
pub struct TrackBuffer {
    frames: StereoBuffer,
    sample_rate: u32,
}

impl TrackBuffer {
    /// Wrap decoded frames; a zero sample rate is rejected by the decoder
    /// before reaching here, so it is treated as 1 Hz to keep durations finite
    pub fn new(frames: StereoBuffer, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Decoded frames
    #[inline]
    pub fn frames(&self) -> &StereoBuffer {
        &self.frames
    }

    /// Number of stereo frames
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds (`frames / sample_rate`)
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }

    /// The first (left) channel as plain samples
    pub fn left_channel(&self) -> Vec<Sample> {
        self.frames.iter().map(|s| s.left).collect()
    }

    /// Read the frame at a fractional position with linear interpolation
    ///
    /// Returns `None` once the position is past the last frame.
    #[inline]
    pub fn frame_at(&self, position: f64) -> Option<StereoSample> {
        if position < 0.0 {
            return Some(StereoSample::silence());
        }
        let index = position as usize;
        if index >= self.frames.len() {
            return None;
        }
        let current = self.frames[index];
        let next = if index + 1 < self.frames.len() {
            self.frames[index + 1]
        } else {
            current
        };
        Some(current.lerp(&next, (position - index as f64) as Sample))
    }
}

/// Transport state of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "Stopped"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}
