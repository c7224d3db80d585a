//! IoU-based face tracker with a hard cap of two identities.
//!
//! Uses greedy matching by Intersection over Union between each track's last
//! box and the current detections. Tracks live in a dense arena addressed
//! through an id-to-index map, so creation and removal stay O(1).
//!
//! The tracker owns identity and position only. Mouth history and the
//! smoothed crop center are stored on the track record but written by the
//! speaker classifier and crop planner respectively.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::config::{GapPolicy, ReframeConfig, MAX_TRACKS};
use super::models::{BoundingBox, Point, TrackId};
use super::speaker::MouthHistory;
use crate::detection::Detection;
use crate::error::{ReframeError, ReframeResult};
use crate::metrics;

/// A face followed across frames.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    /// Current box (held or extrapolated between detections)
    pub bbox: BoundingBox,
    /// Box from the most recent matched detection
    last_observed: BoundingBox,
    /// Per-frame motion of the box center between the last two observations
    velocity: Point,
    /// Frame index of the most recent matched detection
    pub last_seen_frame: u64,
    /// Consecutive sampled frames without a match
    pub misses: u32,
    /// Matched on the current frame
    pub observed: bool,
    /// EMA-smoothed crop focus, written by the crop planner
    pub smoothed_center: Point,
    /// Mouth-openness samples, written by the speaker classifier
    pub mouth: MouthHistory,
    pub speaking: bool,
}

impl Track {
    pub fn new(id: TrackId, bbox: BoundingBox, frame_index: u64, mouth_capacity: usize) -> Self {
        Self {
            id,
            bbox,
            last_observed: bbox,
            velocity: Point::default(),
            last_seen_frame: frame_index,
            misses: 0,
            observed: true,
            smoothed_center: bbox.center(),
            mouth: MouthHistory::new(mouth_capacity),
            speaking: false,
        }
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    fn observe(&mut self, bbox: BoundingBox, frame_index: u64) {
        let gap = frame_index.saturating_sub(self.last_seen_frame).max(1) as f64;
        let previous = self.last_observed.center();
        let current = bbox.center();
        self.velocity = Point::new((current.x - previous.x) / gap, (current.y - previous.y) / gap);
        self.bbox = bbox;
        self.last_observed = bbox;
        self.last_seen_frame = frame_index;
        self.misses = 0;
        self.observed = true;
    }
}

/// A matched track together with this frame's mouth openness, if measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackObservation {
    pub track_id: TrackId,
    pub mouth_openness: Option<f64>,
}

/// What changed in one tracker step.
#[derive(Debug, Clone, Default)]
pub struct TrackUpdate {
    pub observations: Vec<TrackObservation>,
    pub created: Vec<TrackId>,
    /// Displaced by a larger face while at capacity
    pub evicted: Vec<TrackId>,
    /// Dropped after exceeding the miss tolerance
    pub expired: Vec<TrackId>,
}

impl TrackUpdate {
    /// A track was created or removed this step.
    pub fn track_set_changed(&self) -> bool {
        !(self.created.is_empty() && self.evicted.is_empty() && self.expired.is_empty())
    }
}

/// Maintains up to [`MAX_TRACKS`] face identities across frames.
#[derive(Debug)]
pub struct FaceTracker {
    iou_threshold: f64,
    min_confidence: f64,
    miss_tolerance: u32,
    gap_policy: GapPolicy,
    mouth_capacity: usize,
    /// Dense track arena
    tracks: Vec<Track>,
    /// Track id to arena index
    index: HashMap<TrackId, usize>,
    next_track_id: u32,
    tracks_created: u32,
}

impl FaceTracker {
    pub fn new(config: &ReframeConfig) -> Self {
        Self {
            iou_threshold: config.iou_threshold,
            min_confidence: config.min_detection_confidence,
            miss_tolerance: config.track_miss_tolerance,
            gap_policy: config.gap_policy,
            mouth_capacity: config.mouth_history_window,
            tracks: Vec::with_capacity(MAX_TRACKS + 1),
            index: HashMap::new(),
            next_track_id: 1,
            tracks_created: 0,
        }
    }

    /// Live tracks in arena order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.index.get(&id).map(|&i| &self.tracks[i])
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.tracks[i]),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total tracks created so far.
    pub fn tracks_created(&self) -> u32 {
        self.tracks_created
    }

    /// Advance one frame.
    ///
    /// `detections` is `Some` on sampled frames (possibly empty when nothing
    /// was found or the detector failed) and `None` on frames between
    /// samples, where live tracks are carried forward per the gap policy.
    pub fn update(
        &mut self,
        frame_index: u64,
        detections: Option<&[Detection]>,
    ) -> ReframeResult<TrackUpdate> {
        let update = match detections {
            Some(detections) => self.update_sampled(frame_index, detections),
            None => {
                self.carry_forward();
                TrackUpdate::default()
            }
        };

        if self.tracks.len() > MAX_TRACKS {
            return Err(ReframeError::processing(format!(
                "{} tracks alive after frame {}, limit is {}",
                self.tracks.len(),
                frame_index,
                MAX_TRACKS
            )));
        }

        Ok(update)
    }

    fn carry_forward(&mut self) {
        for track in &mut self.tracks {
            track.observed = false;
            if self.gap_policy == GapPolicy::Interpolate && track.misses == 0 {
                track.bbox = track.bbox.translate(track.velocity.x, track.velocity.y);
            }
        }
    }

    fn update_sampled(&mut self, frame_index: u64, detections: &[Detection]) -> TrackUpdate {
        let mut update = TrackUpdate::default();

        let mut candidates: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.min_confidence && d.bbox.is_valid())
            .collect();
        candidates.sort_by(|a, b| {
            b.bbox
                .area()
                .partial_cmp(&a.bbox.area())
                .unwrap_or(Ordering::Equal)
        });

        // All (track, detection) pairs above threshold, best overlap first.
        let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in candidates.iter().enumerate() {
                let iou = track.bbox.iou(&det.bbox);
                if iou >= self.iou_threshold {
                    pairs.push((iou, ti, di));
                }
            }
        }
        pairs.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut track_matched = vec![false; self.tracks.len()];
        let mut det_matched = vec![false; candidates.len()];
        for (_, ti, di) in pairs {
            if track_matched[ti] || det_matched[di] {
                continue;
            }
            track_matched[ti] = true;
            det_matched[di] = true;

            let det = candidates[di];
            let track = &mut self.tracks[ti];
            track.observe(det.bbox, frame_index);
            update.observations.push(TrackObservation {
                track_id: track.id,
                mouth_openness: det.mouth_openness(),
            });
        }

        for (ti, track) in self.tracks.iter_mut().enumerate() {
            if !track_matched[ti] {
                track.misses += 1;
                track.observed = false;
            }
        }

        let expired: Vec<TrackId> = self
            .tracks
            .iter()
            .filter(|t| t.misses >= self.miss_tolerance)
            .map(|t| t.id)
            .collect();
        for id in expired {
            self.remove(id);
            metrics::record_track_expired();
            debug!(track_id = %id, frame = frame_index, "Track expired");
            update.expired.push(id);
        }

        for (di, det) in candidates.iter().enumerate() {
            if det_matched[di] {
                continue;
            }

            if self.tracks.len() >= MAX_TRACKS {
                let Some(smallest) = self.smallest_track() else {
                    continue;
                };
                let smallest_area = self.tracks[smallest].bbox.area();
                if det.bbox.area() <= smallest_area {
                    continue;
                }
                let evicted = self.tracks[smallest].id;
                self.remove(evicted);
                metrics::record_track_evicted();
                debug!(
                    track_id = %evicted,
                    frame = frame_index,
                    area = smallest_area,
                    "Track evicted by larger face"
                );
                update.evicted.push(evicted);
            }

            let id = self.create(det.bbox, frame_index);
            update.observations.push(TrackObservation {
                track_id: id,
                mouth_openness: det.mouth_openness(),
            });
            update.created.push(id);
        }

        update
    }

    fn create(&mut self, bbox: BoundingBox, frame_index: u64) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks_created += 1;

        self.index.insert(id, self.tracks.len());
        self.tracks
            .push(Track::new(id, bbox, frame_index, self.mouth_capacity));

        metrics::record_track_created();
        debug!(
            track_id = %id,
            frame = frame_index,
            x = bbox.x,
            y = bbox.y,
            width = bbox.width,
            height = bbox.height,
            "Track created"
        );
        id
    }

    fn remove(&mut self, id: TrackId) -> Option<Track> {
        let i = self.index.remove(&id)?;
        let removed = self.tracks.swap_remove(i);
        if let Some(moved) = self.tracks.get(i) {
            self.index.insert(moved.id, i);
        }
        Some(removed)
    }

    fn smallest_track(&self) -> Option<usize> {
        self.tracks
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.bbox
                    .area()
                    .partial_cmp(&b.bbox.area())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|(i, _)| i)
    }
}
