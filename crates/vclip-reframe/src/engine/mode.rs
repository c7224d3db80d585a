//! Debounced framing-mode state machine.
//!
//! ```text
//!   <=1 track ───────────────────────────────► Solo
//!   2 tracks, not both speaking ─────────────► DuoSwitch { active }
//!   2 tracks, both speaking for N prior frames ► DuoSplit
//! ```
//!
//! Only entry into split view is debounced. Leaving it happens on the first
//! frame where the two faces are no longer both speaking.

use std::cmp::Ordering;

use tracing::debug;
use vclip_models::ReframeMode;

use super::config::ReframeConfig;
use super::models::TrackId;
use super::tracker::Track;
use crate::error::{ReframeError, ReframeResult};

/// Current framing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeState {
    #[default]
    Solo,
    /// Two faces, framing the active speaker.
    DuoSwitch { active: TrackId },
    /// Two faces stacked top/bottom.
    DuoSplit,
}

impl ModeState {
    pub fn mode(&self) -> ReframeMode {
        match self {
            ModeState::Solo => ReframeMode::Solo,
            ModeState::DuoSwitch { .. } => ReframeMode::DuoSwitch,
            ModeState::DuoSplit => ReframeMode::DuoSplit,
        }
    }

    pub fn active_speaker(&self) -> Option<TrackId> {
        match self {
            ModeState::DuoSwitch { active } => Some(*active),
            _ => None,
        }
    }
}

/// What the selector needs to know about one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakerView {
    pub id: TrackId,
    pub speaking: bool,
    /// Mouth-openness variance, used to pick a speaker when the flags do not
    pub variance: f64,
    pub area: f64,
}

impl From<&Track> for SpeakerView {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            speaking: track.speaking,
            variance: track.mouth.variance(),
            area: track.bbox.area(),
        }
    }
}

/// Chooses the framing mode once per frame.
#[derive(Debug, Clone)]
pub struct ModeSelector {
    state: ModeState,
    /// Consecutive frames with both faces speaking
    simultaneous_frames: u32,
    debounce_frames: u32,
    /// Last active speaker, kept across split view so leaving it does not
    /// flip the camera
    last_active: Option<TrackId>,
}

impl ModeSelector {
    pub fn new(config: &ReframeConfig) -> Self {
        Self {
            state: ModeState::Solo,
            simultaneous_frames: 0,
            debounce_frames: config.simultaneous_speaking_debounce_frames,
            last_active: None,
        }
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    pub fn simultaneous_frames(&self) -> u32 {
        self.simultaneous_frames
    }

    /// Evaluate the transition for one frame.
    pub fn update(&mut self, tracks: &[SpeakerView]) -> ReframeResult<ModeState> {
        let next = match tracks {
            [] | [_] => {
                self.simultaneous_frames = 0;
                ModeState::Solo
            }
            [a, b] => {
                let active = self.select_active(a, b);
                self.last_active = Some(active);

                if a.speaking && b.speaking {
                    let next = if self.simultaneous_frames >= self.debounce_frames {
                        ModeState::DuoSplit
                    } else {
                        ModeState::DuoSwitch { active }
                    };
                    self.simultaneous_frames = self.simultaneous_frames.saturating_add(1);
                    next
                } else {
                    self.simultaneous_frames = 0;
                    ModeState::DuoSwitch { active }
                }
            }
            _ => {
                return Err(ReframeError::processing(format!(
                    "mode selection got {} tracks",
                    tracks.len()
                )))
            }
        };

        if next != self.state {
            debug!(
                from = ?self.state,
                to = ?next,
                simultaneous_frames = self.simultaneous_frames,
                "Mode transition"
            );
        }
        self.state = next;
        Ok(next)
    }

    fn select_active(&self, a: &SpeakerView, b: &SpeakerView) -> TrackId {
        match (a.speaking, b.speaking) {
            (true, false) => return a.id,
            (false, true) => return b.id,
            _ => {}
        }

        if let Some(previous) = self.last_active {
            if previous == a.id || previous == b.id {
                return previous;
            }
        }

        // No history: most mouth movement, then largest face.
        let order = a
            .variance
            .partial_cmp(&b.variance)
            .unwrap_or(Ordering::Equal)
            .then(a.area.partial_cmp(&b.area).unwrap_or(Ordering::Equal));
        match order {
            Ordering::Less => b.id,
            Ordering::Greater => a.id,
            Ordering::Equal => a.id.min(b.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u32, speaking: bool) -> SpeakerView {
        SpeakerView {
            id: TrackId(id),
            speaking,
            variance: if speaking { 8.0 } else { 0.5 },
            area: 40_000.0,
        }
    }

    fn selector() -> ModeSelector {
        ModeSelector::new(&ReframeConfig::default())
    }

    #[test]
    fn test_single_face_is_solo() {
        let mut selector = selector();
        assert_eq!(selector.update(&[]).unwrap(), ModeState::Solo);
        assert_eq!(selector.update(&[view(1, true)]).unwrap(), ModeState::Solo);
    }

    #[test]
    fn test_one_speaker_is_switch_on_that_speaker() {
        let mut selector = selector();
        let state = selector.update(&[view(1, false), view(2, true)]).unwrap();
        assert_eq!(state, ModeState::DuoSwitch { active: TrackId(2) });
    }

    #[test]
    fn test_split_after_debounce() {
        let mut selector = selector();
        let both = [view(1, true), view(2, true)];
        for _ in 0..3 {
            assert_eq!(selector.update(&both).unwrap().mode(), ReframeMode::DuoSwitch);
        }
        // Stays split for as long as both keep speaking.
        for _ in 0..50 {
            assert_eq!(selector.update(&both).unwrap(), ModeState::DuoSplit);
        }
        assert_eq!(selector.simultaneous_frames(), 54);
    }

    #[test]
    fn test_single_quiet_frame_resets_counter() {
        let mut selector = selector();
        let both = [view(1, true), view(2, true)];
        selector.update(&both).unwrap();
        selector.update(&both).unwrap();
        selector.update(&[view(1, true), view(2, false)]).unwrap();
        assert_eq!(selector.simultaneous_frames(), 0);
        for _ in 0..3 {
            assert_ne!(selector.update(&both).unwrap(), ModeState::DuoSplit);
        }
        assert_eq!(selector.update(&both).unwrap(), ModeState::DuoSplit);
    }

    #[test]
    fn test_split_exits_immediately() {
        let mut selector = selector();
        let both = [view(1, true), view(2, true)];
        for _ in 0..4 {
            selector.update(&both).unwrap();
        }
        assert_eq!(selector.state(), ModeState::DuoSplit);
        let state = selector.update(&[view(1, false), view(2, true)]).unwrap();
        assert_eq!(state, ModeState::DuoSwitch { active: TrackId(2) });
    }

    #[test]
    fn test_active_speaker_retained_when_ambiguous() {
        let mut selector = selector();
        selector.update(&[view(1, true), view(2, false)]).unwrap();
        let state = selector.update(&[view(1, false), view(2, false)]).unwrap();
        assert_eq!(state, ModeState::DuoSwitch { active: TrackId(1) });
        let state = selector.update(&[view(1, true), view(2, true)]).unwrap();
        assert_eq!(state, ModeState::DuoSwitch { active: TrackId(1) });
    }

    #[test]
    fn test_initial_active_prefers_variance_then_size() {
        let mut selector = selector();
        let mut quiet_big = view(1, false);
        quiet_big.area = 90_000.0;
        let mut moving = view(2, false);
        moving.variance = 3.0;
        assert_eq!(
            selector.update(&[quiet_big, moving]).unwrap(),
            ModeState::DuoSwitch { active: TrackId(2) }
        );

        let mut selector = ModeSelector::new(&ReframeConfig::default());
        let small = view(1, false);
        let big = SpeakerView {
            area: 90_000.0,
            ..view(2, false)
        };
        assert_eq!(
            selector.update(&[small, big]).unwrap(),
            ModeState::DuoSwitch { active: TrackId(2) }
        );
    }

    #[test]
    fn test_too_many_tracks_is_processing_error() {
        let mut selector = selector();
        let result = selector.update(&[view(1, true), view(2, true), view(3, true)]);
        assert!(matches!(result, Err(ReframeError::Processing(_))));
    }

    #[test]
    fn test_back_to_solo_when_face_leaves() {
        let mut selector = selector();
        selector.update(&[view(1, true), view(2, false)]).unwrap();
        assert_eq!(selector.update(&[view(2, false)]).unwrap(), ModeState::Solo);
    }
}
