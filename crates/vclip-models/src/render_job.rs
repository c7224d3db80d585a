//! Render job descriptions consumed by the reframe worker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::clip_window::{ClipWindow, ClipWindowError, FrameRange};

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RenderJobId(pub String);

impl RenderJobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RenderJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_output_width() -> u32 {
    1080
}

fn default_output_height() -> u32 {
    1920
}

/// One clip render: decoded source frames in, reframed frames out.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    #[serde(default)]
    pub id: RenderJobId,

    /// Directory of decoded source frames (sorted by file name).
    pub frames_dir: PathBuf,

    /// Recorded per-frame face detections (JSON). Without it every frame
    /// is treated as having no faces and the fallback framing is used.
    #[serde(default)]
    pub detections_path: Option<PathBuf>,

    /// Directory that receives numbered output frames.
    pub output_dir: PathBuf,

    /// Source frame rate, used to convert timestamps to frame indices.
    pub fps: f64,

    /// Clip start (`HH:MM:SS.mmm`, `MM:SS` or seconds).
    pub start: String,

    /// Clip end, same formats as `start`.
    pub end: String,

    #[serde(default = "default_output_width")]
    pub output_width: u32,

    #[serde(default = "default_output_height")]
    pub output_height: u32,

    /// Partial engine configuration merged over the defaults.
    #[serde(default)]
    pub config_overrides: serde_json::Map<String, serde_json::Value>,
}

impl RenderJob {
    /// Validate the job description.
    pub fn validate(&self) -> Result<(), String> {
        if self.frames_dir.as_os_str().is_empty() {
            return Err("Frames directory must be specified".to_string());
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err("Output directory must be specified".to_string());
        }

        if self.output_width == 0 || self.output_height == 0 {
            return Err(format!(
                "Output size must be non-zero, got {}x{}",
                self.output_width, self.output_height
            ));
        }

        if self.output_height < 2 {
            return Err("Output height must be at least 2 for split framing".to_string());
        }

        self.clip_window().map_err(|e| e.to_string())?;
        self.frame_range().map_err(|e| e.to_string())?;

        Ok(())
    }

    pub fn clip_window(&self) -> Result<ClipWindow, ClipWindowError> {
        ClipWindow::from_timestamps(&self.start, &self.end)
    }

    /// Frame range the job covers at its declared frame rate.
    pub fn frame_range(&self) -> Result<FrameRange, ClipWindowError> {
        self.clip_window()?.frame_range(self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> RenderJob {
        serde_json::from_value(serde_json::json!({
            "frames_dir": "/tmp/frames",
            "output_dir": "/tmp/out",
            "fps": 30.0,
            "start": "00:00:01",
            "end": "00:00:03",
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let job = job();
        assert_eq!(job.output_width, 1080);
        assert_eq!(job.output_height, 1920);
        assert!(job.detections_path.is_none());
        assert!(job.config_overrides.is_empty());
        assert!(!job.id.as_str().is_empty());
    }

    #[test]
    fn test_frame_range() {
        let range = job().frame_range().unwrap();
        assert_eq!(range.start_frame, 30);
        assert_eq!(range.frame_count, 60);
    }

    #[test]
    fn test_validate() {
        assert!(job().validate().is_ok());

        let mut bad = job();
        bad.end = "00:00:00.5".to_string();
        assert!(bad.validate().is_err());

        let mut bad = job();
        bad.output_width = 0;
        assert!(bad.validate().is_err());

        let mut bad = job();
        bad.fps = 0.0;
        assert!(bad.validate().is_err());
    }
}
