//! Audio decoding
//!
//! Turns one raw stem (a track inside a container held in memory) into a
//! fully decoded [`TrackBuffer`]. The default decoder uses symphonia and
//! understands MP4/AAC stem files as well as plain WAV and FLAC.

use std::io::Cursor;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{EngineError, EngineResult};
use crate::stems::RawStem;
use crate::types::{StereoBuffer, TrackBuffer};

/// Decodes a raw stem into PCM
///
/// Implementations must be shareable across threads: stems of one file are
/// decoded in parallel.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, stem: &RawStem) -> EngineResult<TrackBuffer>;
}

/// Open an in-memory container with symphonia's probe
pub(crate) fn open_container(data: Arc<[u8]>) -> Result<Box<dyn FormatReader>, SymphoniaError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

/// Why the container reader stopped yielding packets
#[derive(Debug, PartialEq)]
enum ReadStop {
    /// Clean end of stream
    End,
    /// Stream parameters changed; the decoder must be reset
    Reset,
    Fail(String),
}

fn read_stop(err: SymphoniaError) -> ReadStop {
    match err {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            ReadStop::End
        }
        SymphoniaError::ResetRequired => ReadStop::Reset,
        e => ReadStop::Fail(e.to_string()),
    }
}

/// Symphonia-backed decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, stem: &RawStem) -> EngineResult<TrackBuffer> {
        let fail = |reason: String| EngineError::Decode {
            stem: stem.index(),
            reason,
        };

        let mut format = open_container(stem.data()).map_err(|e| fail(e.to_string()))?;

        let track = match stem.track_id() {
            Some(id) => format.tracks().iter().find(|t| t.id == id),
            None => format
                .tracks()
                .iter()
                .find(|t| t.codec_params.codec != CODEC_TYPE_NULL),
        }
        .ok_or_else(|| fail("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| fail("unknown sample rate".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| fail(e.to_string()))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut channels = 0usize;
        let mut sample_buf: Option<(SampleBuffer<f32>, usize)> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(e) => match read_stop(e) {
                    ReadStop::End => break,
                    ReadStop::Reset => {
                        log::warn!("Stem {}: decoder reset requested, continuing", stem.index());
                        decoder.reset();
                        continue;
                    }
                    ReadStop::Fail(reason) => return Err(fail(reason)),
                },
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Stem {}: skipping corrupt packet: {}", stem.index(), e);
                    continue;
                }
                Err(e) => return Err(fail(e.to_string())),
            };

            let frames = decoded.capacity();
            let needs_alloc = sample_buf.as_ref().map_or(true, |(_, cap)| *cap < frames);
            if needs_alloc {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                sample_buf = Some((SampleBuffer::new(frames as u64, spec), frames));
            }

            if let Some((buf, _)) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
        }

        let frames = StereoBuffer::from_multichannel(&interleaved, channels.max(1));
        log::debug!(
            "Decoded stem {}: {} frames at {}Hz ({} channels)",
            stem.index(),
            frames.len(),
            sample_rate,
            channels
        );

        Ok(TrackBuffer::new(frames, sample_rate))
    }
}
