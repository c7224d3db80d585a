//! Worker configuration.

use std::path::PathBuf;

use vclip_reframe::ReframeConfig;

use crate::error::WorkerResult;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent render jobs
    pub max_concurrent_jobs: usize,
    /// JSON file listing the render jobs to run
    pub jobs_file: PathBuf,
    /// Capacity of each job's progress channel
    pub progress_buffer: usize,
    /// Engine settings every job starts from before its own overrides
    pub reframe: ReframeConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            jobs_file: PathBuf::from("jobs.json"),
            progress_buffer: 256,
            reframe: ReframeConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Engine defaults come from the `REFRAME_*` variables.
    pub fn from_env() -> WorkerResult<Self> {
        Ok(Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            jobs_file: std::env::var("WORKER_JOBS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("jobs.json")),
            progress_buffer: std::env::var("WORKER_PROGRESS_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
            reframe: ReframeConfig::from_env()?,
        })
    }

    pub fn with_jobs_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.jobs_file = path.into();
        self
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.jobs_file, PathBuf::from("jobs.json"));
        assert!(config.reframe.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = WorkerConfig::default()
            .with_jobs_file("/tmp/jobs.json")
            .with_max_concurrent_jobs(0);
        assert_eq!(config.jobs_file, PathBuf::from("/tmp/jobs.json"));
        assert_eq!(config.max_concurrent_jobs, 1);
    }
}
