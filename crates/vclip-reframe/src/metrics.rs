//! Metrics emitted by the reframing engine.
//!
//! The engine only records through the `metrics` facade; installing a
//! recorder (Prometheus in the worker) is the caller's concern.

use metrics::{counter, histogram};
use vclip_models::ReframeMode;

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_RENDERED_TOTAL: &str = "vclip_reframe_frames_rendered_total";
    pub const MODE_FRAMES_TOTAL: &str = "vclip_reframe_mode_frames_total";
    pub const MODE_TRANSITIONS_TOTAL: &str = "vclip_reframe_mode_transitions_total";

    pub const DETECTOR_CALLS_TOTAL: &str = "vclip_reframe_detector_calls_total";
    pub const DETECTOR_FAILURES_TOTAL: &str = "vclip_reframe_detector_failures_total";

    pub const TRACKS_CREATED_TOTAL: &str = "vclip_reframe_tracks_created_total";
    pub const TRACKS_EVICTED_TOTAL: &str = "vclip_reframe_tracks_evicted_total";
    pub const TRACKS_EXPIRED_TOTAL: &str = "vclip_reframe_tracks_expired_total";

    pub const RENDERS_TOTAL: &str = "vclip_reframe_renders_total";
    pub const RENDER_DURATION_SECONDS: &str = "vclip_reframe_render_duration_seconds";
}

/// Record one composited output frame.
pub fn record_frame(mode: ReframeMode) {
    counter!(names::FRAMES_RENDERED_TOTAL).increment(1);
    let labels = [("mode", mode.as_str())];
    counter!(names::MODE_FRAMES_TOTAL, &labels).increment(1);
}

pub fn record_mode_transition(from: ReframeMode, to: ReframeMode) {
    let labels = [("from", from.as_str()), ("to", to.as_str())];
    counter!(names::MODE_TRANSITIONS_TOTAL, &labels).increment(1);
}

pub fn record_detector_call() {
    counter!(names::DETECTOR_CALLS_TOTAL).increment(1);
}

pub fn record_detector_failure() {
    counter!(names::DETECTOR_FAILURES_TOTAL).increment(1);
}

pub fn record_track_created() {
    counter!(names::TRACKS_CREATED_TOTAL).increment(1);
}

/// A track displaced by a larger face while at capacity.
pub fn record_track_evicted() {
    counter!(names::TRACKS_EVICTED_TOTAL).increment(1);
}

/// A track dropped after exceeding its miss tolerance.
pub fn record_track_expired() {
    counter!(names::TRACKS_EXPIRED_TOTAL).increment(1);
}

/// Record a finished render. `outcome` is `success`, `cancelled` or an
/// error kind.
pub fn record_render(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}
