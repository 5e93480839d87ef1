//! Waveform peak computation
//!
//! Reduces a track to a fixed number of integer peaks (0..=127) for display.
//! Each peak is the absolute maximum of an equal-sized bucket of samples;
//! samples left over after the last full bucket are not represented.

use crate::error::{EngineError, EngineResult};
use crate::types::{Sample, TrackBuffer};

/// Default number of peaks per track
pub const WAVEFORM_LENGTH: usize = 1200;

/// Peak value of a full-scale sample
pub const PEAK_SCALE: u8 = 127;

/// Compute `target_length` peaks from a mono signal
///
/// When the signal is shorter than `target_length` every bucket is empty and
/// every peak is 0. Out-of-range samples saturate at `PEAK_SCALE`.
pub fn generate(samples: &[Sample], target_length: usize) -> EngineResult<Vec<u8>> {
    if target_length == 0 {
        return Err(EngineError::InvalidArgument(
            "waveform length must be at least 1".to_string(),
        ));
    }

    let bucket = samples.len() / target_length;

    Ok((0..target_length)
        .map(|i| {
            let start = i * bucket;
            let end = (start + bucket).min(samples.len());
            let max = samples[start..end]
                .iter()
                .fold(0.0f32, |acc, s| acc.max(s.abs()));
            (max.min(1.0) * PEAK_SCALE as f32).floor() as u8
        })
        .collect())
}

/// Compute peaks from the first channel of a decoded track
pub fn generate_for_buffer(buffer: &TrackBuffer, target_length: usize) -> EngineResult<Vec<u8>> {
    generate(&buffer.left_channel(), target_length)
}

/// Map a stored peak back to a 0..1 amplitude
#[inline]
pub fn peak_to_amplitude(peak: u8) -> f32 {
    peak.min(PEAK_SCALE) as f32 / PEAK_SCALE as f32
}
