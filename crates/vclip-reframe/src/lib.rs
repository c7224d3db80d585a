//! Speaker-aware reframing for ViralClip.
//!
//! This crate turns decoded landscape frames into vertical output frames:
//! - Face tracking and visual speaker detection
//! - Solo / speaker-switch / split-view framing
//! - Smoothed crop planning and frame compositing
//! - Frame source, sink and detector seams, with image-sequence and
//!   recorded-detection implementations
//! - Progress events, cancellation and metrics
//! - Static preview framing

pub mod detection;
pub mod engine;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod preview;
pub mod progress;

pub use detection::{Detection, FaceDetector, MouthLandmarks, NoFaceDetector, RecordedDetector};
pub use engine::{
    reframe, BoundingBox, CropPlan, CropRect, FallbackPolicy, GapPolicy, ModeState, Point,
    ReframeConfig, ReframePipeline, ReframeRequest, RenderContext, TrackId,
};
pub use error::{ReframeError, ReframeResult};
pub use frame::{
    Frame, FrameSink, FrameSource, ImageSequenceSink, ImageSequenceSource, VecFrameSink,
    VecFrameSource,
};
pub use preview::{estimate_preview_focus, preview_crop_normalized, preview_crop_rect};
pub use progress::{ProgressEvent, ProgressSender};
