//! Per-frame crop planning.
//!
//! Every live track's crop focus follows its raw box center through an
//! exponential moving average whose factor depends on the current mode.
//! The plan then places one output-aspect rectangle on the relevant focus
//! (or two half-height rectangles in split view) and translates each back
//! inside the source frame.

use vclip_models::{AspectRatio, ReframeMode};

use super::config::{FallbackPolicy, ReframeConfig};
use super::mode::ModeState;
use super::models::{CropRect, Point, TrackId};
use super::tracker::Track;
use crate::error::{ReframeError, ReframeResult};

/// Where a crop lands on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRegion {
    Full,
    /// Upper half, `output_height / 2` rows.
    Top,
    /// Lower half, the remaining rows.
    Bottom,
}

impl OutputRegion {
    /// `(y_offset, height)` of this region on an output canvas.
    pub fn rows(&self, output_height: u32) -> (u32, u32) {
        let top = output_height / 2;
        match self {
            OutputRegion::Full => (0, output_height),
            OutputRegion::Top => (0, top),
            OutputRegion::Bottom => (top, output_height - top),
        }
    }

    pub(crate) fn slot(&self) -> usize {
        match self {
            OutputRegion::Full => 0,
            OutputRegion::Top => 1,
            OutputRegion::Bottom => 2,
        }
    }
}

/// One source rectangle and its destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropEntry {
    /// Track framed by this entry; `None` for fallback framing
    pub track_id: Option<TrackId>,
    /// Smoothed focus point the rectangle was centred on
    pub focus: Point,
    pub source: CropRect,
    pub region: OutputRegion,
}

/// Rendering instruction for one output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CropPlan {
    pub mode: ReframeMode,
    /// One entry (`Full`) or two (`Top`, `Bottom`)
    pub entries: Vec<CropEntry>,
}

/// One step of `s = alpha * raw + (1 - alpha) * s_prev`.
#[inline]
pub fn ema(previous: Point, raw: Point, alpha: f64) -> Point {
    Point::new(
        alpha * raw.x + (1.0 - alpha) * previous.x,
        alpha * raw.y + (1.0 - alpha) * previous.y,
    )
}

/// Computes crop plans for a fixed source and output size.
#[derive(Debug, Clone)]
pub struct CropPlanner {
    frame_width: u32,
    frame_height: u32,
    alpha_solo: f64,
    alpha_duo_switch: f64,
    alpha_duo_split: f64,
    /// Crop size for a full-canvas region
    full_size: (u32, u32),
    /// Crop sizes for the top and bottom halves
    top_size: (u32, u32),
    bottom_size: (u32, u32),
    fallback_focus: Point,
}

impl CropPlanner {
    pub fn new(
        config: &ReframeConfig,
        frame_width: u32,
        frame_height: u32,
        output_width: u32,
        output_height: u32,
    ) -> ReframeResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(ReframeError::input(format!(
                "source frame size {}x{} is empty",
                frame_width, frame_height
            )));
        }
        let invalid_output = || {
            ReframeError::invalid_config(format!(
                "output size {}x{} cannot hold a split view",
                output_width, output_height
            ))
        };
        let full = AspectRatio::from_dimensions(output_width, output_height)
            .ok_or_else(invalid_output)?;
        let (_, top_rows) = OutputRegion::Top.rows(output_height);
        let (_, bottom_rows) = OutputRegion::Bottom.rows(output_height);
        let top = AspectRatio::from_dimensions(output_width, top_rows).ok_or_else(invalid_output)?;
        let bottom =
            AspectRatio::from_dimensions(output_width, bottom_rows).ok_or_else(invalid_output)?;

        let zoomed = |(w, h): (u32, u32)| {
            (
                ((w as f64 / config.split_zoom).round() as u32).max(1),
                ((h as f64 / config.split_zoom).round() as u32).max(1),
            )
        };

        Ok(Self {
            frame_width,
            frame_height,
            alpha_solo: config.ema_alpha_solo,
            alpha_duo_switch: config.ema_alpha_duo_switch,
            alpha_duo_split: config.ema_alpha_duo_split,
            full_size: full.fit_within(frame_width, frame_height),
            top_size: zoomed(top.fit_within(frame_width, frame_height)),
            bottom_size: zoomed(bottom.fit_within(frame_width, frame_height)),
            fallback_focus: fallback_focus(config.fallback_policy, frame_width, frame_height),
        })
    }

    /// Size of the single-region crop.
    pub fn full_size(&self) -> (u32, u32) {
        self.full_size
    }

    pub fn alpha(&self, mode: ReframeMode) -> f64 {
        match mode {
            ReframeMode::Solo => self.alpha_solo,
            ReframeMode::DuoSwitch => self.alpha_duo_switch,
            ReframeMode::DuoSplit => self.alpha_duo_split,
        }
    }

    /// Advance every track's smoothed center and plan this frame.
    pub fn plan(&self, state: ModeState, tracks: &mut [Track]) -> ReframeResult<CropPlan> {
        let mode = state.mode();
        let alpha = self.alpha(mode);
        for track in tracks.iter_mut() {
            track.smoothed_center = ema(track.smoothed_center, track.bbox.center(), alpha);
        }

        let entries = match state {
            ModeState::Solo => match &*tracks {
                [] => vec![self.entry(None, self.fallback_focus, self.full_size, OutputRegion::Full)],
                [track] => vec![self.track_entry(track, self.full_size, OutputRegion::Full)],
                _ => {
                    return Err(ReframeError::processing(format!(
                        "solo framing with {} tracks",
                        tracks.len()
                    )))
                }
            },
            ModeState::DuoSwitch { active } => {
                let track = tracks.iter().find(|t| t.id == active).ok_or_else(|| {
                    ReframeError::processing(format!("active speaker {} is not tracked", active))
                })?;
                vec![self.track_entry(track, self.full_size, OutputRegion::Full)]
            }
            ModeState::DuoSplit => {
                let [a, b] = &*tracks else {
                    return Err(ReframeError::processing(format!(
                        "split framing with {} tracks",
                        tracks.len()
                    )));
                };
                // Left-hand person goes on top.
                let (top, bottom) = if b.smoothed_center.x < a.smoothed_center.x {
                    (b, a)
                } else {
                    (a, b)
                };
                vec![
                    self.track_entry(top, self.top_size, OutputRegion::Top),
                    self.track_entry(bottom, self.bottom_size, OutputRegion::Bottom),
                ]
            }
        };

        Ok(CropPlan { mode, entries })
    }

    fn track_entry(&self, track: &Track, size: (u32, u32), region: OutputRegion) -> CropEntry {
        self.entry(Some(track.id), track.smoothed_center, size, region)
    }

    fn entry(
        &self,
        track_id: Option<TrackId>,
        focus: Point,
        (width, height): (u32, u32),
        region: OutputRegion,
    ) -> CropEntry {
        CropEntry {
            track_id,
            focus,
            source: CropRect::centered_within(
                focus,
                width,
                height,
                self.frame_width,
                self.frame_height,
            ),
            region,
        }
    }
}

/// Focus point used when no face is tracked.
pub fn fallback_focus(policy: FallbackPolicy, frame_width: u32, frame_height: u32) -> Point {
    let w = frame_width as f64;
    let h = frame_height as f64;
    match policy {
        FallbackPolicy::Center => Point::new(w / 2.0, h / 2.0),
        FallbackPolicy::UpperCenter => Point::new(w / 2.0, h * 0.4),
        FallbackPolicy::RuleOfThirds => Point::new(w / 3.0, h / 3.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::BoundingBox;

    fn track(id: u32, x: f64, y: f64, size: f64) -> Track {
        Track::new(TrackId(id), BoundingBox::new(x, y, size, size), 0, 10)
    }

    fn planner() -> CropPlanner {
        CropPlanner::new(&ReframeConfig::default(), 1920, 1080, 1080, 1920).unwrap()
    }

    #[test]
    fn test_ema_never_overshoots() {
        let prev = Point::new(100.0, 100.0);
        let raw = Point::new(300.0, 50.0);
        for alpha in [0.1, 0.2, 0.4, 1.0] {
            let s = ema(prev, raw, alpha);
            assert!(s.x >= 100.0 && s.x <= 300.0);
            assert!(s.y >= 50.0 && s.y <= 100.0);
        }
        assert_eq!(ema(prev, raw, 0.2), Point::new(140.0, 90.0));
    }

    #[test]
    fn test_solo_centres_on_track() {
        let planner = planner();
        let mut tracks = vec![track(1, 860.0, 440.0, 200.0)];
        let plan = planner.plan(ModeState::Solo, &mut tracks).unwrap();

        assert_eq!(plan.mode, ReframeMode::Solo);
        assert_eq!(plan.entries.len(), 1);
        let entry = plan.entries[0];
        assert_eq!(entry.track_id, Some(TrackId(1)));
        assert_eq!(entry.source, CropRect::new(656, 0, 608, 1080));
        assert_eq!(entry.region, OutputRegion::Full);
    }

    #[test]
    fn test_solo_converges_geometrically() {
        let planner = planner();
        let mut tracks = vec![track(1, 100.0, 100.0, 200.0)];
        tracks[0].smoothed_center = Point::new(960.0, 540.0);

        let mut last_error = f64::MAX;
        for _ in 0..40 {
            planner.plan(ModeState::Solo, &mut tracks).unwrap();
            let error = tracks[0].smoothed_center.distance(&Point::new(200.0, 200.0));
            assert!(error < last_error);
            last_error = error;
        }
        // 0.8^40 of the initial ~832px offset.
        assert!(last_error < 1.0);
    }

    #[test]
    fn test_rect_is_clamped_by_translation() {
        let planner = planner();
        let mut tracks = vec![track(1, 0.0, 0.0, 100.0)];
        let plan = planner.plan(ModeState::Solo, &mut tracks).unwrap();
        assert_eq!(plan.entries[0].source, CropRect::new(0, 0, 608, 1080));
    }

    #[test]
    fn test_duo_switch_frames_active_speaker_with_faster_alpha() {
        let planner = planner();
        let mut tracks = vec![track(1, 200.0, 400.0, 200.0), track(2, 1500.0, 400.0, 200.0)];
        tracks[1].smoothed_center = Point::new(1000.0, 500.0);

        let plan = planner
            .plan(ModeState::DuoSwitch { active: TrackId(2) }, &mut tracks)
            .unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].track_id, Some(TrackId(2)));
        // 0.4 * 1600 + 0.6 * 1000
        assert!((plan.entries[0].focus.x - 1240.0).abs() < 1e-9);
    }

    #[test]
    fn test_duo_switch_unknown_active_is_error() {
        let planner = planner();
        let mut tracks = vec![track(1, 200.0, 400.0, 200.0), track(2, 1500.0, 400.0, 200.0)];
        let result = planner.plan(ModeState::DuoSwitch { active: TrackId(9) }, &mut tracks);
        assert!(matches!(result, Err(ReframeError::Processing(_))));
    }

    #[test]
    fn test_split_places_left_face_on_top() {
        let planner = planner();
        let mut tracks = vec![track(1, 1500.0, 400.0, 200.0), track(2, 200.0, 400.0, 200.0)];
        let plan = planner.plan(ModeState::DuoSplit, &mut tracks).unwrap();

        assert_eq!(plan.mode, ReframeMode::DuoSplit);
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].region, OutputRegion::Top);
        assert_eq!(plan.entries[0].track_id, Some(TrackId(2)));
        assert_eq!(plan.entries[1].region, OutputRegion::Bottom);
        assert_eq!(plan.entries[1].track_id, Some(TrackId(1)));

        // 1080x960 halves are 9:8; the tallest 9:8 crop of 1920x1080 is 1215x1080.
        for entry in &plan.entries {
            assert_eq!((entry.source.width, entry.source.height), (1215, 1080));
            assert!(entry.source.fits_within(1920, 1080));
        }
    }

    #[test]
    fn test_split_zoom_shrinks_halves() {
        let config = ReframeConfig {
            split_zoom: 1.5,
            ..Default::default()
        };
        let planner = CropPlanner::new(&config, 1920, 1080, 1080, 1920).unwrap();
        let mut tracks = vec![track(1, 200.0, 400.0, 200.0), track(2, 1500.0, 400.0, 200.0)];
        let plan = planner.plan(ModeState::DuoSplit, &mut tracks).unwrap();
        assert_eq!(
            (plan.entries[0].source.width, plan.entries[0].source.height),
            (810, 720)
        );
    }

    #[test]
    fn test_no_faces_uses_fallback() {
        let planner = planner();
        let plan = planner.plan(ModeState::Solo, &mut []).unwrap();
        assert_eq!(plan.entries[0].track_id, None);
        assert_eq!(plan.entries[0].source, CropRect::new(656, 0, 608, 1080));

        let config = ReframeConfig {
            fallback_policy: FallbackPolicy::RuleOfThirds,
            ..Default::default()
        };
        let planner = CropPlanner::new(&config, 1920, 1080, 1080, 1920).unwrap();
        let plan = planner.plan(ModeState::Solo, &mut []).unwrap();
        assert_eq!(plan.entries[0].source.x, 336);
    }

    #[test]
    fn test_narrow_source_keeps_full_width() {
        let planner =
            CropPlanner::new(&ReframeConfig::default(), 400, 1080, 1080, 1920).unwrap();
        assert_eq!(planner.full_size(), (400, 711));
        let mut tracks = vec![track(1, 100.0, 900.0, 150.0)];
        let plan = planner.plan(ModeState::Solo, &mut tracks).unwrap();
        let rect = plan.entries[0].source;
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y2(), 1080);
    }

    #[test]
    fn test_rejects_degenerate_output() {
        assert!(CropPlanner::new(&ReframeConfig::default(), 1920, 1080, 1080, 1).is_err());
        assert!(CropPlanner::new(&ReframeConfig::default(), 0, 1080, 1080, 1920).is_err());
    }
}
