//! Error types for reframing operations.

use thiserror::Error;

/// Result type for reframing operations.
pub type ReframeResult<T> = Result<T, ReframeError>;

/// Errors that can occur while reframing a clip.
#[derive(Debug, Error)]
pub enum ReframeError {
    /// Source frames unreadable, missing, or an empty range was requested.
    #[error("Input error: {0}")]
    Input(String),

    /// The face detector failed on a single frame. Absorbed by the
    /// orchestrator as "no detections this frame".
    #[error("Face detection unavailable: {0}")]
    DetectionUnavailable(String),

    /// Internal invariant violation.
    #[error("Processing error: {0}")]
    Processing(String),

    /// The frame sink rejected a frame.
    #[error("Output error: {0}")]
    Output(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl ReframeError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn detection_unavailable(message: impl Into<String>) -> Self {
        Self::DetectionUnavailable(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error ends the render. Only per-frame detector
    /// failures are recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DetectionUnavailable(_))
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::DetectionUnavailable(_) => "detection_unavailable",
            Self::Processing(_) => "processing",
            Self::Output(_) => "output",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
            Self::Image(_) => "image",
            Self::JsonParse(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_detection_failures_are_recoverable() {
        assert!(!ReframeError::detection_unavailable("model timeout").is_fatal());
        assert!(ReframeError::input("empty range").is_fatal());
        assert!(ReframeError::processing("3 tracks").is_fatal());
        assert!(ReframeError::output("sink closed").is_fatal());
        assert!(ReframeError::Cancelled.is_fatal());
    }

    #[test]
    fn test_display_is_human_readable() {
        let err = ReframeError::output("disk full");
        assert_eq!(err.to_string(), "Output error: disk full");
        assert_eq!(err.kind(), "output");
    }
}
