//! Structured job logging utilities.
//!
//! Turns a render's progress events into job-scoped log lines. Per-frame
//! events are folded into one line per 10% of progress.

use tracing::{debug, error, info, warn, Span};
use vclip_models::RenderJobId;
use vclip_reframe::ProgressEvent;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
    last_decile: u32,
}

impl JobLogger {
    pub fn new(job_id: &RenderJobId, operation: &str) -> Self {
        Self::from_string(job_id.as_str(), operation)
    }

    pub fn from_string(job_id: &str, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
            last_decile: 0,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    /// Log one progress event from the render.
    ///
    /// Returns `true` when the event produced a log line at info level or above.
    pub fn observe(&mut self, event: &ProgressEvent) -> bool {
        match event {
            ProgressEvent::Started { total_frames } => {
                self.last_decile = 0;
                self.log_start(&format!("{} frames", total_frames));
                true
            }
            ProgressEvent::FrameProcessed { fraction, mode, .. } => {
                let decile = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u32;
                if decile > self.last_decile {
                    self.last_decile = decile;
                    self.log_progress(&format!("{}% ({})", decile * 10, mode));
                    true
                } else {
                    false
                }
            }
            ProgressEvent::ModeChanged {
                frame_index,
                from,
                to,
            } => {
                debug!(
                    job_id = %self.job_id,
                    frame = frame_index,
                    "Framing {} -> {}", from, to
                );
                false
            }
            ProgressEvent::Complete { frames_written } => {
                self.log_completion(&format!("{} frames written", frames_written));
                true
            }
            ProgressEvent::Cancelled { frames_written } => {
                self.log_warning(&format!(
                    "cancelled after {} frames, output discarded",
                    frames_written
                ));
                true
            }
            ProgressEvent::Failed { error } => {
                self.log_error(error);
                true
            }
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::ReframeMode;

    fn frame(fraction: f64) -> ProgressEvent {
        ProgressEvent::FrameProcessed {
            frame_index: 0,
            fraction,
            mode: ReframeMode::Solo,
        }
    }

    #[test]
    fn test_job_logger_creation() {
        let job_id = RenderJobId::from_string("job-1");
        let logger = JobLogger::new(&job_id, "reframe");

        assert_eq!(logger.job_id(), "job-1");
        assert_eq!(logger.operation(), "reframe");
    }

    #[test]
    fn test_progress_logged_once_per_decile() {
        let mut logger = JobLogger::from_string("job-2", "reframe");
        assert!(logger.observe(&ProgressEvent::Started { total_frames: 100 }));

        assert!(!logger.observe(&frame(0.05)));
        assert!(logger.observe(&frame(0.10)));
        assert!(!logger.observe(&frame(0.15)));
        assert!(logger.observe(&frame(0.35)));
        assert!(!logger.observe(&frame(0.39)));
        assert!(logger.observe(&frame(1.0)));
    }

    #[test]
    fn test_terminal_events_always_logged() {
        let mut logger = JobLogger::from_string("job-3", "reframe");
        assert!(logger.observe(&ProgressEvent::Complete { frames_written: 3 }));
        assert!(logger.observe(&ProgressEvent::Cancelled { frames_written: 1 }));
        assert!(logger.observe(&ProgressEvent::Failed {
            error: "bad frame".to_string()
        }));
        assert!(!logger.observe(&ProgressEvent::ModeChanged {
            frame_index: 4,
            from: ReframeMode::Solo,
            to: ReframeMode::DuoSwitch,
        }));
    }
}
