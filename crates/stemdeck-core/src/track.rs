//! Decoded tracks and track sets
//!
//! A [`TrackSet`] is built once per successful load and replaced wholesale on
//! the next one. Tracks are immutable after decoding; their mute state lives
//! in the gain controller.

use basedrop::Shared;
use rayon::prelude::*;

use crate::audio::gc_handle;
use crate::decode::AudioDecoder;
use crate::error::{EngineError, EngineResult};
use crate::stems::{layout, RawStem, StemSlot};
use crate::types::{StemRole, TrackBuffer};
use crate::waveform;

/// One decoded track of a loaded file
pub struct Track {
    role: StemRole,
    buffer: Shared<TrackBuffer>,
    waveform: Vec<u8>,
    muted_on_load: bool,
}

impl Track {
    /// Wrap a decoded buffer and compute its waveform
    pub fn new(
        role: StemRole,
        buffer: TrackBuffer,
        waveform_length: usize,
        muted_on_load: bool,
    ) -> EngineResult<Self> {
        let waveform = waveform::generate_for_buffer(&buffer, waveform_length)?;
        Ok(Self {
            role,
            buffer: Shared::new(&gc_handle(), buffer),
            waveform,
            muted_on_load,
        })
    }

    pub fn role(&self) -> StemRole {
        self.role
    }

    /// Display name (presentation only)
    pub fn name(&self) -> &'static str {
        self.role.name()
    }

    /// Decoded audio, shareable with the audio thread
    pub fn buffer(&self) -> &Shared<TrackBuffer> {
        &self.buffer
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn waveform(&self) -> &[u8] {
        &self.waveform
    }

    /// Mute state the track starts with after loading
    pub fn muted_on_load(&self) -> bool {
        self.muted_on_load
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("role", &self.role)
            .field("duration", &self.duration())
            .field("waveform_len", &self.waveform.len())
            .field("muted_on_load", &self.muted_on_load)
            .finish()
    }
}

/// Ordered tracks of one loaded file, in display order
#[derive(Debug)]
pub struct TrackSet {
    tracks: Vec<Track>,
    duration: f64,
}

impl TrackSet {
    /// Build a set; its duration is the longest track's duration
    pub fn new(tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::duration).fold(0.0, f64::max);
        Self { tracks, duration }
    }

    /// Decode extracted stems into a set, in parallel
    ///
    /// Fails with the error of the first failing stem in container order;
    /// nothing is kept from a failed decode.
    pub fn decode(
        stems: &[RawStem],
        decoder: &dyn AudioDecoder,
        waveform_length: usize,
        mute_master: bool,
    ) -> EngineResult<Self> {
        if waveform_length == 0 {
            return Err(EngineError::InvalidArgument(
                "waveform length must be at least 1".to_string(),
            ));
        }
        let slots = layout(stems.len(), mute_master)?;

        let results: Vec<(usize, EngineResult<Track>)> = slots
            .par_iter()
            .map(|slot: &StemSlot| {
                let result = decoder
                    .decode(&stems[slot.container_index])
                    .and_then(|buffer| Track::new(slot.role, buffer, waveform_length, slot.muted));
                (slot.container_index, result)
            })
            .collect();

        let mut tracks = Vec::with_capacity(results.len());
        let mut first_error: Option<(usize, EngineError)> = None;
        for (container_index, result) in results {
            match result {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    if first_error.as_ref().map_or(true, |(i, _)| container_index < *i) {
                        first_error = Some((container_index, e));
                    }
                }
            }
        }
        if let Some((_, e)) = first_error {
            return Err(e);
        }

        Ok(Self::new(tracks))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Timeline length in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
