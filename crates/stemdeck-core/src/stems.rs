//! Stem extraction and layout
//!
//! A stem file is an MP4 container with five audio tracks stored as
//! master, drums, bass, other, vocals. The player shows them as
//! drums, bass, other, vocals, master. A container with a single audio
//! track is an ordinary song and loads as one `Mix` track.
//!
//! Extraction only splits the container: each [`RawStem`] shares the
//! container bytes and names the track to decode, so nothing is copied
//! per stem.

use std::sync::Arc;

use symphonia::core::codecs::CODEC_TYPE_NULL;

use crate::decode::open_container;
use crate::error::{EngineError, EngineResult};
use crate::types::{StemRole, NUM_STEMS};

/// Container index of each stem, in display order
pub const TRACK_MAP: [usize; NUM_STEMS] = [1, 2, 3, 4, 0];

/// One undecoded stem inside a container
#[derive(Clone)]
pub struct RawStem {
    index: usize,
    data: Arc<[u8]>,
    track_id: Option<u32>,
}

impl RawStem {
    /// `index` is the stem's position in container order; `track_id`
    /// selects a track inside `data` (`None` = first audio track)
    pub fn new(index: usize, data: Arc<[u8]>, track_id: Option<u32>) -> Self {
        Self {
            index,
            data,
            track_id,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Shared container bytes
    pub fn data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn track_id(&self) -> Option<u32> {
        self.track_id
    }
}

impl std::fmt::Debug for RawStem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStem")
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .field("track_id", &self.track_id)
            .finish()
    }
}

/// Splits a container into raw stems, in container order
pub trait StemExtractor: Send + Sync {
    fn extract(&self, data: &[u8]) -> EngineResult<Vec<RawStem>>;
}

/// Extractor that enumerates the audio tracks of any container symphonia reads
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaStemExtractor;

impl SymphoniaStemExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl StemExtractor for SymphoniaStemExtractor {
    fn extract(&self, data: &[u8]) -> EngineResult<Vec<RawStem>> {
        let data: Arc<[u8]> = Arc::from(data);
        let format =
            open_container(Arc::clone(&data)).map_err(|e| EngineError::Extract(e.to_string()))?;

        let stems: Vec<RawStem> = format
            .tracks()
            .iter()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .enumerate()
            .map(|(index, track)| RawStem::new(index, Arc::clone(&data), Some(track.id)))
            .collect();

        log::debug!("Extracted {} audio tracks from {} bytes", stems.len(), data.len());
        Ok(stems)
    }
}

/// Where a displayed track comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemSlot {
    /// Index into the extracted stems
    pub container_index: usize,
    pub role: StemRole,
    /// Initial mute state
    pub muted: bool,
}

/// Map an extracted stem count to the displayed track layout
///
/// One stem loads as a single unmuted `Mix` track. Five or more load as the
/// five stems in display order; extra container tracks are ignored. Any
/// other count is rejected.
pub fn layout(stem_count: usize, mute_master: bool) -> EngineResult<Vec<StemSlot>> {
    match stem_count {
        1 => Ok(vec![StemSlot {
            container_index: 0,
            role: StemRole::Mix,
            muted: false,
        }]),
        n if n >= NUM_STEMS => Ok(StemRole::DISPLAY_ORDER
            .iter()
            .zip(TRACK_MAP)
            .map(|(&role, container_index)| StemSlot {
                container_index,
                role,
                muted: mute_master && role == StemRole::Master,
            })
            .collect()),
        0 => Err(EngineError::InvalidArgument(
            "container has no audio tracks".to_string(),
        )),
        n => Err(EngineError::InvalidArgument(format!(
            "unsupported stem count {} (expected 1 or at least {})",
            n, NUM_STEMS
        ))),
    }
}
