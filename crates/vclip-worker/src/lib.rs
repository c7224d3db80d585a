//! Reframe render worker.
//!
//! This crate provides:
//! - Job executor running render jobs concurrently from a job file
//! - Per-job engine configuration overrides
//! - Job-scoped progress logging
//! - Graceful shutdown through cooperative cancellation

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{
    load_jobs, merge_config, render_job, JobExecutor, JobOutcome, JobReport, RunReport,
};
pub use logging::JobLogger;
