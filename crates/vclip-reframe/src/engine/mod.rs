//! Speaker-aware reframing engine.
//!
//! Converts landscape footage into a 9:16 clip that keeps one or two people
//! in frame. Per frame, data flows strictly downward:
//!
//! ```text
//! frame ─► detections ─► FaceTracker ─► SpeakerClassifier ─► ModeSelector
//!                                                                │
//!        output frame ◄── FrameCompositor ◄── CropPlanner ◄──────┘
//! ```
//!
//! - [`FaceTracker`]: IoU matching, at most two identities
//! - [`SpeakerClassifier`]: mouth-openness variance over a rolling window
//! - [`ModeSelector`]: `Solo` / `DuoSwitch` / `DuoSplit` with debounced split entry
//! - [`CropPlanner`]: EMA-smoothed, bounds-clamped crop rectangles
//! - [`FrameCompositor`]: crop, scale and vertical stacking
//! - [`reframe`]: the per-clip loop with progress and cancellation
//!
//! All component state is confined to one [`ReframePipeline`]; independent
//! renders share nothing and may run concurrently.

pub mod compositor;
pub mod config;
pub mod crop_planner;
pub mod mode;
pub mod models;
pub mod orchestrator;
pub mod speaker;
pub mod tracker;

pub use compositor::FrameCompositor;
pub use config::{FallbackPolicy, GapPolicy, ReframeConfig, MAX_TRACKS};
pub use crop_planner::{ema, CropEntry, CropPlan, CropPlanner, OutputRegion};
pub use mode::{ModeSelector, ModeState, SpeakerView};
pub use models::{BoundingBox, CropRect, Point, TrackId};
pub use orchestrator::{reframe, FrameOutput, ReframePipeline, ReframeRequest, RenderContext};
pub use speaker::{MouthHistory, SpeakerClassifier};
pub use tracker::{FaceTracker, Track, TrackObservation, TrackUpdate};
