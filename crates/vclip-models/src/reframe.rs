//! Framing modes and render summaries for speaker-aware reframing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Framing strategy used for an output frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ReframeMode {
    /// Follow a single subject (zero or one face on screen).
    #[default]
    Solo,
    /// Two faces, cut to whoever is speaking.
    DuoSwitch,
    /// Two faces speaking together, stacked top/bottom.
    DuoSplit,
}

impl ReframeMode {
    /// All modes, in state machine order.
    pub const ALL: [ReframeMode; 3] = [
        ReframeMode::Solo,
        ReframeMode::DuoSwitch,
        ReframeMode::DuoSplit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReframeMode::Solo => "solo",
            ReframeMode::DuoSwitch => "duo_switch",
            ReframeMode::DuoSplit => "duo_split",
        }
    }

    /// Number of output regions a frame in this mode is composed of.
    pub fn region_count(&self) -> usize {
        match self {
            ReframeMode::DuoSplit => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ReframeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReframeMode {
    type Err = ReframeModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solo" => Ok(ReframeMode::Solo),
            "duo_switch" => Ok(ReframeMode::DuoSwitch),
            "duo_split" => Ok(ReframeMode::DuoSplit),
            _ => Err(ReframeModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown reframe mode: {0}")]
pub struct ReframeModeParseError(String);

/// Number of output frames rendered in each mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModeCounts {
    pub solo: u64,
    pub duo_switch: u64,
    pub duo_split: u64,
}

impl ModeCounts {
    pub fn record(&mut self, mode: ReframeMode) {
        match mode {
            ReframeMode::Solo => self.solo += 1,
            ReframeMode::DuoSwitch => self.duo_switch += 1,
            ReframeMode::DuoSplit => self.duo_split += 1,
        }
    }

    pub fn get(&self, mode: ReframeMode) -> u64 {
        match mode {
            ReframeMode::Solo => self.solo,
            ReframeMode::DuoSwitch => self.duo_switch,
            ReframeMode::DuoSplit => self.duo_split,
        }
    }

    pub fn total(&self) -> u64 {
        self.solo + self.duo_switch + self.duo_split
    }
}

/// Outcome of a successful reframe render.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReframeSummary {
    /// Output frames handed to the sink.
    pub frames_written: u64,
    /// Output frames per framing mode.
    pub mode_counts: ModeCounts,
    /// Number of times the framing mode changed.
    pub mode_transitions: u32,
    /// Sampled frames on which the face detector was invoked.
    pub detector_calls: u64,
    /// Sampled frames on which the detector failed (treated as no faces).
    pub detector_failures: u64,
    /// Face tracks created over the clip.
    pub tracks_created: u32,
    /// Output dimensions.
    pub output_width: u32,
    pub output_height: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReframeSummary {
    /// Share of output frames rendered in `mode`, 0.0 for an empty render.
    pub fn mode_share(&self, mode: ReframeMode) -> f64 {
        let total = self.mode_counts.total();
        if total == 0 {
            return 0.0;
        }
        self.mode_counts.get(mode) as f64 / total as f64
    }

    /// Wall-clock render time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
