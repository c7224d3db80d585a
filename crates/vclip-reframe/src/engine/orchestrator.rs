//! Drives one clip render through the engine.
//!
//! Frames are processed strictly in order on the calling thread. Detection
//! runs on every `detection_interval`-th frame of the clip; tracker, speaker
//! classifier, mode selector, crop planner and compositor run on every
//! frame. Cancellation is checked between frames.

use std::time::Instant;

use chrono::Utc;
use image::RgbImage;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn};
use vclip_models::{ClipWindow, FrameRange, ModeCounts, ReframeMode, ReframeSummary};

use super::compositor::FrameCompositor;
use super::config::ReframeConfig;
use super::crop_planner::{CropPlan, CropPlanner};
use super::mode::{ModeSelector, ModeState, SpeakerView};
use super::speaker::SpeakerClassifier;
use super::tracker::{FaceTracker, TrackUpdate};
use crate::detection::{Detection, FaceDetector};
use crate::error::{ReframeError, ReframeResult};
use crate::frame::{Frame, FrameSink, FrameSource};
use crate::metrics;
use crate::progress::ProgressSender;

/// What to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ReframeRequest {
    /// Used for log correlation only
    pub job_id: Option<String>,
    pub range: FrameRange,
    pub output_width: u32,
    pub output_height: u32,
}

impl ReframeRequest {
    pub fn new(range: FrameRange, output_width: u32, output_height: u32) -> Self {
        Self {
            job_id: None,
            range,
            output_width,
            output_height,
        }
    }

    /// Request covering a clip given as start offset and duration in seconds.
    pub fn from_window(
        window: &ClipWindow,
        fps: f64,
        output_width: u32,
        output_height: u32,
    ) -> ReframeResult<Self> {
        let range = window
            .frame_range(fps)
            .map_err(|e| ReframeError::input(e.to_string()))?;
        Ok(Self::new(range, output_width, output_height))
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

/// Progress and cancellation plumbing for a render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub progress: Option<ProgressSender>,
    /// Render stops before the next frame once this reads `true`.
    pub cancel: Option<watch::Receiver<bool>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }
}

/// The result of processing one frame.
#[derive(Debug)]
pub struct FrameOutput {
    pub image: RgbImage,
    pub state: ModeState,
    pub plan: CropPlan,
    pub tracks: TrackUpdate,
}

/// Per-render engine state: every component, fed one frame at a time.
pub struct ReframePipeline {
    tracker: FaceTracker,
    classifier: SpeakerClassifier,
    selector: ModeSelector,
    planner: CropPlanner,
    compositor: FrameCompositor,
}

impl ReframePipeline {
    pub fn new(
        config: &ReframeConfig,
        frame_width: u32,
        frame_height: u32,
        output_width: u32,
        output_height: u32,
    ) -> ReframeResult<Self> {
        config.validate()?;
        Ok(Self {
            tracker: FaceTracker::new(config),
            classifier: SpeakerClassifier::new(config),
            selector: ModeSelector::new(config),
            planner: CropPlanner::new(
                config,
                frame_width,
                frame_height,
                output_width,
                output_height,
            )?,
            compositor: FrameCompositor::new(
                frame_width,
                frame_height,
                output_width,
                output_height,
            ),
        })
    }

    pub fn tracker(&self) -> &FaceTracker {
        &self.tracker
    }

    pub fn state(&self) -> ModeState {
        self.selector.state()
    }

    /// Track, classify, select and plan one frame without compositing.
    ///
    /// `detections` is `None` on frames between detection samples.
    pub fn plan_frame(
        &mut self,
        frame_index: u64,
        detections: Option<&[Detection]>,
    ) -> ReframeResult<(ModeState, CropPlan, TrackUpdate)> {
        let update = self.tracker.update(frame_index, detections)?;

        for observation in &update.observations {
            if let Some(track) = self.tracker.get_mut(observation.track_id) {
                self.classifier.update(track, observation.mouth_openness);
            }
        }

        let views: Vec<SpeakerView> = self.tracker.tracks().iter().map(SpeakerView::from).collect();
        let state = self.selector.update(&views)?;
        let plan = self.planner.plan(state, self.tracker.tracks_mut())?;

        Ok((state, plan, update))
    }

    /// Run the full pipeline on `frame`.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detections: Option<&[Detection]>,
    ) -> ReframeResult<FrameOutput> {
        let (state, plan, tracks) = self.plan_frame(frame.index, detections)?;
        let image = self.compositor.compose(frame, &plan)?;
        Ok(FrameOutput {
            image,
            state,
            plan,
            tracks,
        })
    }
}

#[derive(Debug, Default)]
struct RenderStats {
    frames_written: u64,
    mode_counts: ModeCounts,
    mode_transitions: u32,
    detector_calls: u64,
    detector_failures: u64,
    tracks_created: u32,
}

/// Reframe `request.range` of `source` into `sink`.
///
/// The sink sees either every frame of the range followed by `finish`, or
/// `abort` on any error or cancellation. Detector errors never fail the
/// render; they count as frames with no faces.
pub fn reframe<S, D, K>(
    source: &mut S,
    detector: &mut D,
    sink: &mut K,
    request: &ReframeRequest,
    config: &ReframeConfig,
    ctx: &RenderContext,
) -> ReframeResult<ReframeSummary>
where
    S: FrameSource + ?Sized,
    D: FaceDetector + ?Sized,
    K: FrameSink + ?Sized,
{
    let span = info_span!(
        "reframe",
        job_id = request.job_id.as_deref().unwrap_or("-"),
        frames = request.range.frame_count
    );
    let _enter = span.enter();

    let started_at = Utc::now();
    let timer = Instant::now();
    let mut stats = RenderStats::default();

    let result = render_frames(source, detector, sink, request, config, ctx, &mut stats)
        .and_then(|()| sink.finish());

    let elapsed = timer.elapsed().as_secs_f64();
    match result {
        Ok(()) => {
            metrics::record_render("success", elapsed);
            if let Some(progress) = &ctx.progress {
                progress.complete(stats.frames_written);
            }
            info!(
                frames = stats.frames_written,
                solo = stats.mode_counts.solo,
                duo_switch = stats.mode_counts.duo_switch,
                duo_split = stats.mode_counts.duo_split,
                transitions = stats.mode_transitions,
                detector_failures = stats.detector_failures,
                elapsed_secs = elapsed,
                "Reframe complete"
            );
            Ok(ReframeSummary {
                frames_written: stats.frames_written,
                mode_counts: stats.mode_counts,
                mode_transitions: stats.mode_transitions,
                detector_calls: stats.detector_calls,
                detector_failures: stats.detector_failures,
                tracks_created: stats.tracks_created,
                output_width: request.output_width,
                output_height: request.output_height,
                started_at,
                finished_at: Utc::now(),
            })
        }
        Err(e) => {
            sink.abort();
            metrics::record_render(e.kind(), elapsed);
            match &e {
                ReframeError::Cancelled => {
                    info!(frames = stats.frames_written, "Reframe cancelled");
                    if let Some(progress) = &ctx.progress {
                        progress.cancelled(stats.frames_written);
                    }
                }
                _ => {
                    warn!(frames = stats.frames_written, error = %e, "Reframe failed");
                    if let Some(progress) = &ctx.progress {
                        progress.failed(e.to_string());
                    }
                }
            }
            Err(e)
        }
    }
}

fn render_frames<S, D, K>(
    source: &mut S,
    detector: &mut D,
    sink: &mut K,
    request: &ReframeRequest,
    config: &ReframeConfig,
    ctx: &RenderContext,
    stats: &mut RenderStats,
) -> ReframeResult<()>
where
    S: FrameSource + ?Sized,
    D: FaceDetector + ?Sized,
    K: FrameSink + ?Sized,
{
    let range = request.range;
    if range.is_empty() {
        return Err(ReframeError::input("requested frame range is empty"));
    }
    let available = source.frame_count();
    if range.end_frame() > available {
        return Err(ReframeError::input(format!(
            "frames {}..{} requested but source has {}",
            range.start_frame,
            range.end_frame(),
            available
        )));
    }

    let (frame_width, frame_height) = source.dimensions();
    let mut pipeline = ReframePipeline::new(
        config,
        frame_width,
        frame_height,
        request.output_width,
        request.output_height,
    )?;

    info!(
        start_frame = range.start_frame,
        frame_count = range.frame_count,
        source_width = frame_width,
        source_height = frame_height,
        output_width = request.output_width,
        output_height = request.output_height,
        detection_interval = config.detection_interval,
        "Starting reframe"
    );
    if let Some(progress) = &ctx.progress {
        progress.started(range.frame_count);
    }

    let interval = u64::from(config.detection_interval);
    let mut previous_mode = ReframeMode::Solo;

    for (i, index) in range.indices().enumerate() {
        if ctx.is_cancelled() {
            return Err(ReframeError::Cancelled);
        }

        let frame = source.read_frame(index)?;

        let detections = if (i as u64) % interval == 0 {
            stats.detector_calls += 1;
            metrics::record_detector_call();
            match detector.detect(&frame) {
                Ok(detections) => Some(detections),
                Err(e) => {
                    stats.detector_failures += 1;
                    metrics::record_detector_failure();
                    warn!(frame = index, error = %e, "Face detection failed, treating as no faces");
                    Some(Vec::new())
                }
            }
        } else {
            None
        };

        let output = pipeline.process_frame(&frame, detections.as_deref())?;
        let mode = output.state.mode();
        if output.tracks.track_set_changed() {
            debug!(
                frame = index,
                live = pipeline.tracker().len(),
                created = output.tracks.created.len(),
                removed = output.tracks.evicted.len() + output.tracks.expired.len(),
                "Track set changed"
            );
        }

        sink.write_frame(&output.image)?;
        stats.frames_written += 1;
        stats.mode_counts.record(mode);
        metrics::record_frame(mode);

        if mode != previous_mode {
            stats.mode_transitions += 1;
            metrics::record_mode_transition(previous_mode, mode);
            debug!(frame = index, from = %previous_mode, to = %mode, "Framing mode changed");
            if let Some(progress) = &ctx.progress {
                progress.mode_changed(index, previous_mode, mode);
            }
            previous_mode = mode;
        }

        if let Some(progress) = &ctx.progress {
            let fraction = (i + 1) as f64 / range.frame_count as f64;
            progress.frame_processed(index, fraction, mode);
        }
    }

    stats.tracks_created = pipeline.tracker().tracks_created();
    Ok(())
}
