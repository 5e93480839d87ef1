//! Source scheduling
//!
//! Arms one buffer source per track, all against the same clock instant and
//! the same timeline offset, and tears them all down together. A session is
//! the set of sources from one arming; it is never partially installed.

use crate::audio::{AudioError, AudioSubsystem, SourceId, SourceRequest};
use crate::error::{EngineError, EngineResult};
use crate::gain::GainController;
use crate::track::TrackSet;

/// Sources armed together by one `start_all`
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    id: u64,
    instant: f64,
    offset: f64,
    sources: Vec<(usize, SourceId)>,
}

impl PlaybackSession {
    /// Monotonic session number
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Clock instant every source starts at
    pub fn instant(&self) -> f64 {
        self.instant
    }

    /// Timeline offset every source starts from
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// `(track index, source)` pairs in track order
    pub fn sources(&self) -> &[(usize, SourceId)] {
        &self.sources
    }
}

/// Owner of the active playback session
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    session: Option<PlaybackSession>,
    next_session: u64,
    /// Sources the subsystem refused to stop; retried on every teardown
    unstopped: Vec<(usize, SourceId)>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// `(track index, source)` pairs whose stop was rejected and is pending
    pub fn unstopped(&self) -> &[(usize, SourceId)] {
        &self.unstopped
    }

    /// Arm every track at `instant`, reading from `offset`
    ///
    /// Muted tracks are armed too; their gain unit keeps them silent. Tracks
    /// shorter than `offset` finish immediately. If any start fails, the
    /// sources armed so far are stopped and no session is installed.
    ///
    /// Nothing is armed while a source of an earlier session could not be
    /// stopped: it would keep sounding at its old offset.
    pub fn start_all<A: AudioSubsystem + ?Sized>(
        &mut self,
        audio: &mut A,
        tracks: &TrackSet,
        gains: &GainController,
        instant: f64,
        offset: f64,
    ) -> EngineResult<&PlaybackSession> {
        if self.session.is_some() || !self.unstopped.is_empty() {
            self.stop_all(audio);
        }
        if !self.unstopped.is_empty() {
            return Err(EngineError::SourcesStillActive(self.unstopped.len()));
        }

        let mut sources = Vec::with_capacity(tracks.len());
        for (index, track) in tracks.iter().enumerate() {
            let started = gains
                .gain_id(index)
                .ok_or_else(|| {
                    EngineError::InvalidArgument(format!("track {} has no gain unit", index))
                })
                .and_then(|gain| {
                    audio
                        .start_source(SourceRequest {
                            buffer: track.buffer().clone(),
                            gain,
                            when: instant,
                            offset,
                        })
                        .map_err(EngineError::from)
                });

            match started {
                Ok(source) => sources.push((index, source)),
                Err(e) => {
                    log::warn!("Failed to arm track {}: {}, rolling back", index, e);
                    self.stop_sources(audio, sources);
                    return Err(e);
                }
            }
        }

        let id = self.next_session;
        self.next_session += 1;
        log::debug!(
            "Session {}: {} sources at t={:.3}s from {:.3}s",
            id,
            sources.len(),
            instant,
            offset
        );

        Ok(&*self.session.insert(PlaybackSession {
            id,
            instant,
            offset,
            sources,
        }))
    }

    /// Stop every source of the active session; returns how many were stopped
    ///
    /// Sources left over from an earlier failed teardown are retried first.
    /// A source the subsystem refuses to stop is kept in [`Self::unstopped`]
    /// and blocks the next `start_all`. The session is always cleared.
    pub fn stop_all<A: AudioSubsystem + ?Sized>(&mut self, audio: &mut A) -> usize {
        let mut sources = std::mem::take(&mut self.unstopped);
        let session = self.session.take();
        if let Some(session) = &session {
            sources.extend_from_slice(&session.sources);
        }
        if sources.is_empty() {
            return 0;
        }

        let stopped = self.stop_sources(audio, sources);
        if let Some(session) = session {
            log::debug!("Session {}: stopped {} sources", session.id, stopped);
        }
        stopped
    }

    fn stop_sources<A: AudioSubsystem + ?Sized>(
        &mut self,
        audio: &mut A,
        sources: Vec<(usize, SourceId)>,
    ) -> usize {
        let mut stopped = 0;
        for (index, source) in sources {
            match audio.stop_source(source) {
                Ok(()) => stopped += 1,
                // Never issued by this subsystem; nothing left to stop
                Err(e @ AudioError::UnknownSource(_)) => {
                    log::warn!("Failed to stop track {} source: {}", index, e)
                }
                Err(e) => {
                    log::warn!("Failed to stop track {} source: {}, will retry", index, e);
                    self.unstopped.push((index, source));
                }
            }
        }
        stopped
    }
}
