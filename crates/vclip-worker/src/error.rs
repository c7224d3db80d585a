//! Worker error types.

use thiserror::Error;
use vclip_reframe::ReframeError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Reframe error: {0}")]
    Reframe(#[from] ReframeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if the job stopped on a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WorkerError::Cancelled | WorkerError::Reframe(ReframeError::Cancelled)
        )
    }

    /// Check if the job description itself is at fault. Re-running an
    /// unchanged job cannot succeed.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::InvalidJob(_)
                | WorkerError::ConfigError(_)
                | WorkerError::Json(_)
                | WorkerError::Reframe(ReframeError::InvalidConfig(_))
        )
    }
}
