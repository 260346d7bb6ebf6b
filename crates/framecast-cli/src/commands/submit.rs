//! Run designs through the task runtime

use anyhow::{Context, Result};
use chrono::Utc;
use framecast_codegen::GenerationRequest;
use framecast_runtime::{GenerationJob, Runtime};
use std::path::Path;
use std::time::Duration;

use super::{load_config, read_design};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the submit command
///
/// Every design becomes one task; snapshots are printed as JSON lines once
/// each task is terminal.
pub async fn run(
    config_path: Option<&str>,
    designs: &[String],
    platform: &str,
    style: Option<&str>,
    requester: Option<&str>,
    history: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let runtime = Runtime::from_config(&config.project)
        .await
        .context("Failed to start runtime")?;

    let mut task_ids = Vec::with_capacity(designs.len());
    for design in designs {
        let mut request = GenerationRequest::new(read_design(Path::new(design))?, platform);
        if let Some(style) = style {
            request = request.with_style(style);
        }
        let mut job = GenerationJob::new(request).with_submitted_at(Utc::now());
        if let Some(requester) = requester {
            job = job.with_requester(requester);
        }
        let task_id = runtime.submit(job).await?;
        tracing::info!("Submitted {} as task {}", design, task_id);
        task_ids.push(task_id);
    }

    for task_id in &task_ids {
        let snapshot = runtime.wait(task_id, POLL_INTERVAL).await?;
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    if history && let Some(requester) = requester {
        let tasks = runtime.tasks_for(requester, None).await?;
        tracing::info!("{} task(s) on record for {}", tasks.len(), requester);
        for task in tasks {
            println!("{}\t{}", task.task_id, task.status);
        }
    }

    runtime.shutdown().await.context("Shutdown error")?;
    Ok(())
}
