//! Job executor.
//!
//! Runs render jobs concurrently, one engine pipeline per job. Each render
//! is CPU-bound and sequential, so it runs on the blocking pool while its
//! progress events are logged from an async task.

use std::path::Path;
use std::sync::Arc;

use metrics::{counter, gauge};
use serde_json::{Map, Value};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn, Instrument};

use vclip_models::{RenderJob, RenderJobId, ReframeSummary};
use vclip_reframe::{
    reframe, FaceDetector, ImageSequenceSink, ImageSequenceSource, NoFaceDetector,
    ProgressSender, RecordedDetector, ReframeConfig, ReframeRequest, RenderContext,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

const JOBS_TOTAL: &str = "vclip_worker_jobs_total";
const ACTIVE_JOBS: &str = "vclip_worker_active_jobs";

/// Final state of one render job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed(ReframeSummary),
    Cancelled,
    Failed(String),
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Completed(_) => "completed",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::Failed(_) => "failed",
        }
    }

    fn from_result(result: WorkerResult<ReframeSummary>) -> Self {
        match result {
            Ok(summary) => JobOutcome::Completed(summary),
            Err(e) if e.is_cancelled() => JobOutcome::Cancelled,
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: RenderJobId,
    pub outcome: JobOutcome,
}

/// Outcomes of a batch, in job-file order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    fn count(&self, outcome: &str) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.outcome.as_str() == outcome)
            .count()
    }

    pub fn completed(&self) -> usize {
        self.count("completed")
    }

    pub fn cancelled(&self) -> usize {
        self.count("cancelled")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }
}

/// Job executor that renders jobs from a job file.
pub struct JobExecutor {
    config: WorkerConfig,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            job_semaphore,
            shutdown,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Request cancellation of every running and queued job.
    ///
    /// Running renders stop after their in-flight frame and discard output.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Load the configured job file and run every job in it.
    pub async fn run(&self) -> WorkerResult<RunReport> {
        let jobs = load_jobs(&self.config.jobs_file)?;
        info!(
            "Loaded {} jobs from {}, running up to {} at a time",
            jobs.len(),
            self.config.jobs_file.display(),
            self.config.max_concurrent_jobs
        );
        Ok(self.run_jobs(jobs).await)
    }

    /// Run `jobs` concurrently, bounded by `max_concurrent_jobs`.
    pub async fn run_jobs(&self, jobs: Vec<RenderJob>) -> RunReport {
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let job_id = job.id.clone();
            let semaphore = Arc::clone(&self.job_semaphore);
            let cancel = self.shutdown.subscribe();
            let base = self.config.reframe.clone();
            let buffer = self.config.progress_buffer;

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
                Self::execute_job(job, base, buffer, cancel).await
            });
            handles.push((job_id, handle));
        }

        let mut report = RunReport::default();
        for (job_id, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => JobOutcome::from_result(result),
                Err(e) => JobOutcome::Failed(format!("Job task aborted: {}", e)),
            };

            match &outcome {
                JobOutcome::Completed(summary) => info!(
                    job_id = %job_id,
                    frames = summary.frames_written,
                    elapsed_secs = summary.elapsed_secs(),
                    "Job {} completed successfully", job_id
                ),
                JobOutcome::Cancelled => warn!(job_id = %job_id, "Job {} cancelled", job_id),
                JobOutcome::Failed(e) => error!(job_id = %job_id, "Job {} failed: {}", job_id, e),
            }
            counter!(JOBS_TOTAL, "outcome" => outcome.as_str()).increment(1);

            report.jobs.push(JobReport { job_id, outcome });
        }

        info!(
            completed = report.completed(),
            cancelled = report.cancelled(),
            failed = report.failed(),
            "All jobs finished"
        );
        report
    }

    async fn execute_job(
        job: RenderJob,
        base: ReframeConfig,
        progress_buffer: usize,
        cancel: watch::Receiver<bool>,
    ) -> WorkerResult<ReframeSummary> {
        let cancelled = *cancel.borrow();
        if cancelled {
            debug!(job_id = %job.id, "Skipping job, shutdown requested");
            return Err(WorkerError::Cancelled);
        }

        let logger = JobLogger::new(&job.id, "reframe");
        let span = logger.create_span();

        job.validate().map_err(WorkerError::invalid_job)?;
        let config = merge_config(&base, &job.config_overrides)?;

        let (progress, mut events) = ProgressSender::channel(progress_buffer.max(1));
        let log_task = tokio::spawn(
            async move {
                let mut logger = logger;
                while let Some(event) = events.recv().await {
                    logger.observe(&event);
                }
            }
            .instrument(span.clone()),
        );

        gauge!(ACTIVE_JOBS).increment(1.0);
        let ctx = RenderContext::new()
            .with_progress(progress)
            .with_cancel(cancel);
        let result = tokio::task::spawn_blocking(move || {
            let _enter = span.enter();
            render_job(&job, &config, &ctx)
        })
        .await;
        gauge!(ACTIVE_JOBS).decrement(1.0);

        // The progress sender was dropped with the render context, so the
        // log task drains what is buffered and exits.
        if let Err(e) = log_task.await {
            warn!("Progress logger task failed: {}", e);
        }

        result.map_err(|e| WorkerError::job_failed(format!("Render task failed: {}", e)))?
    }
}

/// Read a JSON array of render jobs.
pub fn load_jobs(path: impl AsRef<Path>) -> WorkerResult<Vec<RenderJob>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        WorkerError::config_error(format!("Cannot read job file {}: {}", path.display(), e))
    })?;
    let jobs: Vec<RenderJob> = serde_json::from_str(&content)?;
    Ok(jobs)
}

/// Apply a job's partial engine configuration over `base`.
///
/// Unknown keys are rejected so a typo cannot silently fall back to a default.
pub fn merge_config(
    base: &ReframeConfig,
    overrides: &Map<String, Value>,
) -> WorkerResult<ReframeConfig> {
    let mut value = serde_json::to_value(base)?;
    let fields = value
        .as_object_mut()
        .ok_or_else(|| WorkerError::config_error("Engine config did not serialize to an object"))?;

    for (key, override_value) in overrides {
        if !fields.contains_key(key) {
            return Err(WorkerError::config_error(format!(
                "Unknown config override '{}'",
                key
            )));
        }
        fields.insert(key.clone(), override_value.clone());
    }

    let config: ReframeConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Render one job synchronously: image sequence in, image sequence out.
pub fn render_job(
    job: &RenderJob,
    config: &ReframeConfig,
    ctx: &RenderContext,
) -> WorkerResult<ReframeSummary> {
    let range = job
        .frame_range()
        .map_err(|e| WorkerError::invalid_job(e.to_string()))?;

    let mut detector: Box<dyn FaceDetector + Send> = match &job.detections_path {
        Some(path) => Box::new(RecordedDetector::load(path)?),
        None => {
            debug!(job_id = %job.id, "No detections file, using fallback framing");
            Box::new(NoFaceDetector)
        }
    };
    let mut source = ImageSequenceSource::open(&job.frames_dir)?;
    let mut sink = ImageSequenceSink::create(&job.output_dir)?;

    let request = ReframeRequest::new(range, job.output_width, job.output_height)
        .with_job_id(job.id.as_str());

    let summary = reframe(
        &mut source,
        detector.as_mut(),
        &mut sink,
        &request,
        config,
        ctx,
    )?;
    Ok(summary)
}
