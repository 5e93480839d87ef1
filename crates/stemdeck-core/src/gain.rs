//! Per-track gain units
//!
//! Every track is routed through its own gain unit: 1.0 when audible, 0.0
//! when muted. Mute changes apply immediately and never touch sources, the
//! transport state or the clock, so toggling a stem mid-playback cannot
//! cause drift.
//!
//! Gain units only exist once an audio subsystem does. Until then the
//! controller just tracks mute flags; [`GainController::materialize`] creates
//! the units with the current flags when audio is opened.

use crate::audio::{AudioSubsystem, GainId};
use crate::error::{EngineError, EngineResult};
use crate::track::TrackSet;
use crate::types::Sample;

#[derive(Debug, Clone, Copy)]
struct GainUnit {
    muted: bool,
    id: Option<GainId>,
}

/// Gain value for a mute flag
#[inline]
pub fn gain_for(muted: bool) -> Sample {
    if muted {
        0.0
    } else {
        1.0
    }
}

/// Mute flags and gain units of one track set
#[derive(Debug, Clone, Default)]
pub struct GainController {
    units: Vec<GainUnit>,
}

impl GainController {
    /// One unit per flag, not yet materialized
    pub fn new(muted: impl IntoIterator<Item = bool>) -> Self {
        Self {
            units: muted
                .into_iter()
                .map(|muted| GainUnit { muted, id: None })
                .collect(),
        }
    }

    /// Units for a track set, using each track's initial mute state
    pub fn for_track_set(set: &TrackSet) -> Self {
        Self::new(set.iter().map(|t| t.muted_on_load()))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn unit(&self, index: usize) -> EngineResult<&GainUnit> {
        self.units.get(index).ok_or(EngineError::OutOfRange {
            index,
            count: self.units.len(),
        })
    }

    pub fn is_muted(&self, index: usize) -> EngineResult<bool> {
        self.unit(index).map(|u| u.muted)
    }

    /// Current gain value of a track
    pub fn gain(&self, index: usize) -> EngineResult<Sample> {
        self.unit(index).map(|u| gain_for(u.muted))
    }

    /// Gain unit a track's source must be routed through
    pub fn gain_id(&self, index: usize) -> Option<GainId> {
        self.units.get(index).and_then(|u| u.id)
    }

    /// Whether every unit exists in the audio subsystem
    pub fn is_materialized(&self) -> bool {
        self.units.iter().all(|u| u.id.is_some())
    }

    /// Create the missing gain units inside `audio`
    ///
    /// All or nothing: units created by a failing call are released again.
    pub fn materialize<A: AudioSubsystem + ?Sized>(&mut self, audio: &mut A) -> EngineResult<()> {
        let mut created = Vec::new();
        for (index, unit) in self.units.iter().enumerate() {
            if unit.id.is_some() {
                continue;
            }
            match audio.create_gain(gain_for(unit.muted)) {
                Ok(id) => created.push((index, id)),
                Err(e) => {
                    for (_, id) in created {
                        if let Err(release_err) = audio.release_gain(id) {
                            log::warn!("Failed to release gain unit {:?}: {}", id, release_err);
                        }
                    }
                    return Err(e.into());
                }
            }
        }

        for (index, id) in created {
            self.units[index].id = Some(id);
        }
        Ok(())
    }

    /// Mute or unmute a track, effective immediately
    ///
    /// If the subsystem rejects the change the flag keeps its previous value.
    pub fn set_mute<A: AudioSubsystem + ?Sized>(
        &mut self,
        audio: Option<&mut A>,
        index: usize,
        muted: bool,
    ) -> EngineResult<()> {
        let unit = *self.unit(index)?;
        if let (Some(audio), Some(id)) = (audio, unit.id) {
            audio.set_gain(id, gain_for(muted), None)?;
        }
        self.units[index].muted = muted;
        Ok(())
    }

    /// Flip a track's mute flag; returns the new flag
    pub fn toggle_mute<A: AudioSubsystem + ?Sized>(
        &mut self,
        audio: Option<&mut A>,
        index: usize,
    ) -> EngineResult<bool> {
        let muted = !self.is_muted(index)?;
        self.set_mute(audio, index, muted)?;
        Ok(muted)
    }

    /// Release every gain unit (best effort)
    pub fn release<A: AudioSubsystem + ?Sized>(&mut self, audio: &mut A) {
        for unit in &mut self.units {
            if let Some(id) = unit.id.take() {
                if let Err(e) = audio.release_gain(id) {
                    log::warn!("Failed to release gain unit {:?}: {}", id, e);
                }
            }
        }
    }
}
