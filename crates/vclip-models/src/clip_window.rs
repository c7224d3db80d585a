//! Clip windows: the time range of a source video that one render covers.
//!
//! Callers describe clips with timestamps (`HH:MM:SS.mmm`, `MM:SS` or
//! plain seconds); the reframing engine works on frame indices.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half-open range of frame indices `[start_frame, start_frame + frame_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct FrameRange {
    pub start_frame: u64,
    pub frame_count: u64,
}

impl FrameRange {
    pub fn new(start_frame: u64, frame_count: u64) -> Self {
        Self {
            start_frame,
            frame_count,
        }
    }

    /// One past the last frame index.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Iterate the absolute frame indices in order.
    pub fn indices(&self) -> std::ops::Range<u64> {
        self.start_frame..self.end_frame()
    }
}

/// Start offset and duration of a clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipWindow {
    pub start_secs: f64,
    pub duration_secs: f64,
}

impl ClipWindow {
    /// Create a window, rejecting negative or non-finite values.
    pub fn new(start_secs: f64, duration_secs: f64) -> Result<Self, ClipWindowError> {
        if !start_secs.is_finite() || !duration_secs.is_finite() {
            return Err(ClipWindowError::NotFinite);
        }
        if start_secs < 0.0 {
            return Err(ClipWindowError::NegativeStart(start_secs));
        }
        if duration_secs <= 0.0 {
            return Err(ClipWindowError::EmptyDuration(duration_secs));
        }
        Ok(Self {
            start_secs,
            duration_secs,
        })
    }

    /// Build a window from a start and end timestamp.
    pub fn from_timestamps(start: &str, end: &str) -> Result<Self, ClipWindowError> {
        let start_secs = parse_timestamp(start)?;
        let end_secs = parse_timestamp(end)?;
        if end_secs <= start_secs {
            return Err(ClipWindowError::EndNotAfterStart {
                start_secs,
                end_secs,
            });
        }
        Self::new(start_secs, end_secs - start_secs)
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Frame range covered at `fps`. Both ends are truncated to whole frames.
    pub fn frame_range(&self, fps: f64) -> Result<FrameRange, ClipWindowError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ClipWindowError::InvalidFps(fps));
        }
        let start_frame = (self.start_secs * fps).floor() as u64;
        let end_frame = (self.end_secs() * fps).floor() as u64;
        Ok(FrameRange::new(
            start_frame,
            end_frame.saturating_sub(start_frame),
        ))
    }
}

/// Parse `HH:MM:SS(.mmm)`, `MM:SS(.mmm)` or `SS(.mmm)` into seconds.
pub fn parse_timestamp(ts: &str) -> Result<f64, ClipWindowError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(ClipWindowError::InvalidTimestamp(ts.to_string()));
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(ClipWindowError::InvalidTimestamp(ts.to_string()));
    }

    // Seconds first, then minutes, then hours.
    let mut total = 0.0;
    let mut scale = 1.0;
    for part in parts.iter().rev() {
        let value: f64 = part
            .parse()
            .map_err(|_| ClipWindowError::InvalidTimestamp(ts.to_string()))?;
        if value < 0.0 || !value.is_finite() {
            return Err(ClipWindowError::InvalidTimestamp(ts.to_string()));
        }
        total += value * scale;
        scale *= 60.0;
    }
    Ok(total)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipWindowError {
    #[error("Invalid timestamp '{0}', expected HH:MM:SS, MM:SS or SS (optionally with .mmm)")]
    InvalidTimestamp(String),
    #[error("Clip start cannot be negative: {0}")]
    NegativeStart(f64),
    #[error("Clip duration must be positive: {0}")]
    EmptyDuration(f64),
    #[error("Clip end ({end_secs:.3}s) must be after start ({start_secs:.3}s)")]
    EndNotAfterStart { start_secs: f64, end_secs: f64 },
    #[error("Frame rate must be positive: {0}")]
    InvalidFps(f64),
    #[error("Clip window values must be finite")]
    NotFinite,
}
