//! Shared data models for the ViralClip reframing backend.
//!
//! This crate provides Serde-serializable types for:
//! - Framing modes and render summaries
//! - Output aspect ratios
//! - Clip windows (timestamps to frame ranges)
//! - Normalized frame geometry
//! - Render job descriptions

pub mod aspect;
pub mod clip_window;
pub mod rect;
pub mod reframe;
pub mod render_job;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError};
pub use clip_window::{parse_timestamp, ClipWindow, ClipWindowError, FrameRange};
pub use rect::{NormalizedPoint, NormalizedRect};
pub use reframe::{ModeCounts, ReframeMode, ReframeModeParseError, ReframeSummary};
pub use render_job::{RenderJob, RenderJobId};
