//! Configuration for the reframing engine.
//!
//! One immutable value is built per render and borrowed by every
//! component; nothing reads tunables from global state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ReframeError, ReframeResult};

/// Maximum number of simultaneously tracked faces.
pub const MAX_TRACKS: usize = 2;

/// Track motion between sampled detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Keep the last detected box.
    #[default]
    Hold,
    /// Extrapolate the box along its last observed per-frame velocity.
    Interpolate,
}

/// Framing used when no face is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Center crop
    #[default]
    Center,
    /// Horizontally centred, focus at 40% of the frame height
    UpperCenter,
    /// Focus on the upper-left thirds intersection
    RuleOfThirds,
}

impl FromStr for GapPolicy {
    type Err = ReframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hold" => Ok(Self::Hold),
            "interpolate" => Ok(Self::Interpolate),
            _ => Err(ReframeError::invalid_config(format!("unknown gap policy: {}", s))),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = ReframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" => Ok(Self::Center),
            "upper_center" => Ok(Self::UpperCenter),
            "rule_of_thirds" => Ok(Self::RuleOfThirds),
            _ => Err(ReframeError::invalid_config(format!(
                "unknown fallback policy: {}",
                s
            ))),
        }
    }
}

/// Tunables for one reframe render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReframeConfig {
    // === Detection ===
    /// Run the detector on every Nth frame of the clip (default: 2)
    pub detection_interval: u32,

    /// Detections below this confidence are ignored (default: 0.5)
    pub min_detection_confidence: f64,

    // === Tracking ===
    /// Minimum IoU to match a detection to an existing track (default: 0.3)
    pub iou_threshold: f64,

    /// Consecutive sampled frames without a match before a track is
    /// dropped (default: 5)
    pub track_miss_tolerance: u32,

    /// Track motion between sampled frames (default: hold)
    pub gap_policy: GapPolicy,

    // === Speaker classification ===
    /// Mouth-openness variance at or above which a face is speaking (default: 5.0)
    pub speaking_threshold: f64,

    /// Mouth-openness samples kept per track (default: 10)
    pub mouth_history_window: usize,

    /// Samples required before a track can be classified as speaking (default: 3)
    pub min_speaking_samples: usize,

    // === Mode selection ===
    /// Consecutive both-speaking frames required before split view (default: 3)
    pub simultaneous_speaking_debounce_frames: u32,

    // === Camera smoothing ===
    /// EMA factor for the crop center in solo mode (default: 0.2)
    pub ema_alpha_solo: f64,

    /// EMA factor while cutting between two speakers (default: 0.4)
    pub ema_alpha_duo_switch: f64,

    /// EMA factor for each half of the split view (default: 0.2)
    pub ema_alpha_duo_split: f64,

    // === Composition ===
    /// Zoom applied to each half in split view; 1.0 is the largest crop (default: 1.0)
    pub split_zoom: f64,

    /// Framing with no tracked face (default: center)
    pub fallback_policy: FallbackPolicy,
}

impl Default for ReframeConfig {
    fn default() -> Self {
        Self {
            detection_interval: 2,
            min_detection_confidence: 0.5,

            iou_threshold: 0.3,
            track_miss_tolerance: 5,
            gap_policy: GapPolicy::Hold,

            speaking_threshold: 5.0,
            mouth_history_window: 10,
            min_speaking_samples: 3,

            simultaneous_speaking_debounce_frames: 3,

            ema_alpha_solo: 0.2,
            ema_alpha_duo_switch: 0.4,
            ema_alpha_duo_split: 0.2,

            split_zoom: 1.0,
            fallback_policy: FallbackPolicy::Center,
        }
    }
}

impl ReframeConfig {
    /// Detect on every frame and follow faces closely.
    pub fn responsive() -> Self {
        Self {
            detection_interval: 1,
            track_miss_tolerance: 8,
            gap_policy: GapPolicy::Interpolate,
            ema_alpha_solo: 0.35,
            ema_alpha_duo_switch: 0.6,
            ema_alpha_duo_split: 0.35,
            ..Default::default()
        }
    }

    /// Slow, steady camera for talking-head content.
    pub fn stable() -> Self {
        Self {
            track_miss_tolerance: 10,
            ema_alpha_solo: 0.1,
            ema_alpha_duo_switch: 0.25,
            ema_alpha_duo_split: 0.1,
            simultaneous_speaking_debounce_frames: 6,
            ..Default::default()
        }
    }

    /// Defaults overlaid with `REFRAME_*` environment variables.
    ///
    /// Unparseable numeric values fall back to the default; the result is
    /// validated before it is returned.
    pub fn from_env() -> ReframeResult<Self> {
        let defaults = Self::default();
        let config = Self {
            detection_interval: env_or("REFRAME_DETECTION_INTERVAL", defaults.detection_interval),
            min_detection_confidence: env_or(
                "REFRAME_MIN_DETECTION_CONFIDENCE",
                defaults.min_detection_confidence,
            ),
            iou_threshold: env_or("REFRAME_IOU_THRESHOLD", defaults.iou_threshold),
            track_miss_tolerance: env_or(
                "REFRAME_TRACK_MISS_TOLERANCE",
                defaults.track_miss_tolerance,
            ),
            gap_policy: match std::env::var("REFRAME_GAP_POLICY") {
                Ok(s) => s.parse()?,
                Err(_) => defaults.gap_policy,
            },
            speaking_threshold: env_or("REFRAME_SPEAKING_THRESHOLD", defaults.speaking_threshold),
            mouth_history_window: env_or(
                "REFRAME_MOUTH_HISTORY_WINDOW",
                defaults.mouth_history_window,
            ),
            min_speaking_samples: env_or(
                "REFRAME_MIN_SPEAKING_SAMPLES",
                defaults.min_speaking_samples,
            ),
            simultaneous_speaking_debounce_frames: env_or(
                "REFRAME_DEBOUNCE_FRAMES",
                defaults.simultaneous_speaking_debounce_frames,
            ),
            ema_alpha_solo: env_or("REFRAME_EMA_ALPHA_SOLO", defaults.ema_alpha_solo),
            ema_alpha_duo_switch: env_or(
                "REFRAME_EMA_ALPHA_DUO_SWITCH",
                defaults.ema_alpha_duo_switch,
            ),
            ema_alpha_duo_split: env_or(
                "REFRAME_EMA_ALPHA_DUO_SPLIT",
                defaults.ema_alpha_duo_split,
            ),
            split_zoom: env_or("REFRAME_SPLIT_ZOOM", defaults.split_zoom),
            fallback_policy: match std::env::var("REFRAME_FALLBACK_POLICY") {
                Ok(s) => s.parse()?,
                Err(_) => defaults.fallback_policy,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every knob is in range.
    pub fn validate(&self) -> ReframeResult<()> {
        if self.detection_interval == 0 {
            return Err(ReframeError::invalid_config("detection_interval must be at least 1"));
        }
        for (name, alpha) in [
            ("ema_alpha_solo", self.ema_alpha_solo),
            ("ema_alpha_duo_switch", self.ema_alpha_duo_switch),
            ("ema_alpha_duo_split", self.ema_alpha_duo_split),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(ReframeError::invalid_config(format!(
                    "{} must be in (0, 1], got {}",
                    name, alpha
                )));
            }
        }
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(ReframeError::invalid_config(format!(
                "iou_threshold must be in (0, 1], got {}",
                self.iou_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(ReframeError::invalid_config(format!(
                "min_detection_confidence must be in [0, 1], got {}",
                self.min_detection_confidence
            )));
        }
        if self.track_miss_tolerance == 0 {
            return Err(ReframeError::invalid_config("track_miss_tolerance must be at least 1"));
        }
        if !(self.speaking_threshold.is_finite() && self.speaking_threshold >= 0.0) {
            return Err(ReframeError::invalid_config(format!(
                "speaking_threshold must be non-negative, got {}",
                self.speaking_threshold
            )));
        }
        if self.mouth_history_window < 2 {
            return Err(ReframeError::invalid_config("mouth_history_window must be at least 2"));
        }
        if self.min_speaking_samples == 0 || self.min_speaking_samples > self.mouth_history_window {
            return Err(ReframeError::invalid_config(format!(
                "min_speaking_samples must be in [1, {}], got {}",
                self.mouth_history_window, self.min_speaking_samples
            )));
        }
        if !(self.split_zoom.is_finite() && self.split_zoom >= 1.0) {
            return Err(ReframeError::invalid_config(format!(
                "split_zoom must be >= 1.0, got {}",
                self.split_zoom
            )));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
