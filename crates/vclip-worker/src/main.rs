//! Reframe render worker binary.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vclip_worker::{JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vclip=info".parse()?)
        .add_directive("vclip_reframe=info".parse()?)
        .add_directive("vclip_worker=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vclip-worker");

    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to install metrics recorder: {}", e);
            None
        }
    };

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    info!("Worker config: {:?}", config);

    let executor = Arc::new(JobExecutor::new(config));

    // Ctrl-C cancels running jobs; they discard partial output
    let shutdown_executor = Arc::clone(&executor);
    let shutdown_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown_executor.shutdown();
        }
    });

    let report = executor.run().await.context("Executor error")?;
    shutdown_handle.abort();

    if let Some(handle) = metrics_handle {
        debug!("Final metrics:\n{}", handle.render());
    }

    info!(
        completed = report.completed(),
        cancelled = report.cancelled(),
        failed = report.failed(),
        "Worker shutdown complete"
    );

    if report.failed() > 0 {
        anyhow::bail!("{} of {} jobs failed", report.failed(), report.jobs.len());
    }
    Ok(())
}
