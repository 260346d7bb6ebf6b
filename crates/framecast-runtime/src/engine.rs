//! Task execution engine

use anyhow::{Context, bail};
use framecast_codegen::{ErrorKind, ErrorRecord, Pipeline, PipelineResult};
use framecast_core::ProjectConfig;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::jobs::GenerationJob;
use crate::store::{MemoryResultStore, PgResultStore, ResultStore};
use crate::task::{TaskId, TaskRecord, TaskSnapshot};

/// Task history length when the caller gives no limit
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 14);

/// Runs generation jobs in the background
///
/// `submit` stores a queued record and returns at once; a spawned task
/// waits for a worker slot, runs the pipeline on a blocking thread under a
/// wall-clock budget, and stores the outcome.
pub struct Runtime {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn ResultStore>,
    workers: usize,
    slots: Arc<Semaphore>,
    run_timeout: Duration,
    result_ttl: Duration,
    closed: AtomicBool,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    /// Create a runtime around a pipeline and a store
    pub fn new(pipeline: Pipeline, store: Arc<dyn ResultStore>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            workers: DEFAULT_WORKERS,
            slots: Arc::new(Semaphore::new(DEFAULT_WORKERS)),
            run_timeout: DEFAULT_RUN_TIMEOUT,
            result_ttl: DEFAULT_RESULT_TTL,
            closed: AtomicBool::new(false),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Build pipeline and store from project configuration
    ///
    /// Uses PostgreSQL when `runtime.database_url` is set, memory otherwise.
    pub async fn from_config(config: &ProjectConfig) -> Result<Self> {
        let pipeline = Pipeline::new(config).context("Failed to build generation pipeline")?;
        let settings = &config.runtime;

        let store: Arc<dyn ResultStore> = match &settings.database_url {
            Some(url) => Arc::new(PgResultStore::connect(url).await?),
            None => Arc::new(MemoryResultStore::new()),
        };

        Ok(Self::new(pipeline, store)
            .with_workers(settings.workers)
            .with_run_timeout(settings.run_timeout())
            .with_result_ttl(settings.result_ttl()))
    }

    /// Set the number of runs allowed to execute at once
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.slots = Arc::new(Semaphore::new(self.workers));
        self
    }

    /// Set the wall-clock budget of a single run
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Set how long finished records are retained
    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    /// The pipeline jobs run through
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Accept a job and return its id without waiting for the run
    pub async fn submit(&self, job: GenerationJob) -> Result<TaskId> {
        // Held until the worker is tracked, so shutdown cannot miss it
        let mut in_flight = self.in_flight.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            bail!("Runtime is shut down; not accepting new tasks");
        }

        let record = TaskRecord::queued(&job, self.result_ttl);
        let task_id = record.task_id;
        self.store
            .put(&record)
            .await
            .context("Failed to record queued task")?;

        tracing::info!(
            task = %task_id,
            platform = %record.target_platform,
            requester = record.requester_id.as_deref().unwrap_or("-"),
            "Task queued"
        );

        let worker = Worker {
            pipeline: Arc::clone(&self.pipeline),
            store: Arc::clone(&self.store),
            slots: Arc::clone(&self.slots),
            run_timeout: self.run_timeout,
            result_ttl: self.result_ttl,
        };
        let handle = tokio::spawn(worker.execute(record, job));

        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);

        Ok(task_id)
    }

    /// Current view of a task; `None` for unknown or expired ids
    pub async fn status(&self, task_id: &TaskId) -> Result<Option<TaskSnapshot>> {
        Ok(self.store.get(task_id).await?.map(|r| r.snapshot()))
    }

    /// Poll until the task is terminal
    pub async fn wait(&self, task_id: &TaskId, poll: Duration) -> Result<TaskSnapshot> {
        loop {
            match self.status(task_id).await? {
                Some(snapshot) if snapshot.status.is_terminal() => return Ok(snapshot),
                Some(_) => tokio::time::sleep(poll).await,
                None => bail!("Unknown task {}", task_id),
            }
        }
    }

    /// Recent tasks of one requester, newest first
    pub async fn tasks_for(
        &self,
        requester_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TaskSnapshot>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let records = self.store.list_for_requester(requester_id, limit).await?;
        Ok(records.iter().map(TaskRecord::snapshot).collect())
    }

    /// Drop records past their retention window
    pub async fn purge_expired(&self) -> Result<u64> {
        let purged = self.store.purge_expired().await?;
        if purged > 0 {
            tracing::info!("Purged {} expired task(s)", purged);
        }
        Ok(purged)
    }

    /// Stop accepting tasks and wait for those already accepted to finish
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down Framecast runtime");

        let handles = {
            let mut in_flight = self.in_flight.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *in_flight)
        };
        tracing::debug!("Waiting for {} task(s) to finish", handles.len());
        for outcome in join_all(handles).await {
            if let Err(e) = outcome {
                tracing::error!("Task worker ended abnormally: {}", e);
            }
        }

        tracing::info!("Runtime shutdown complete");
        Ok(())
    }
}

/// Everything a spawned task needs to execute one job
struct Worker {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn ResultStore>,
    slots: Arc<Semaphore>,
    run_timeout: Duration,
    result_ttl: Duration,
}

impl Worker {
    async fn execute(self, record: TaskRecord, job: GenerationJob) {
        let task_id = record.task_id;
        let platform = record.target_platform.clone();

        let Ok(slot) = Arc::clone(&self.slots).acquire_owned().await else {
            let failed = ErrorRecord::fatal("runtime", ErrorKind::Stage, "worker slots closed");
            let result = PipelineResult::rejected(failed, &platform, None, Duration::ZERO);
            self.store_final(record.finish(result, self.result_ttl)).await;
            return;
        };

        let record = record.start();
        if let Err(e) = self.store.put(&record).await {
            tracing::error!(task = %task_id, "Failed to record running task: {:#}", e);
        }
        tracing::debug!(task = %task_id, "Task running");

        let started = Instant::now();
        let pipeline = Arc::clone(&self.pipeline);
        let request = job.request;
        // The slot is released by the blocking thread, so a run that outlives
        // its budget still counts against the worker limit
        let run = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            pipeline.run(&request)
        });

        let result = match tokio::time::timeout(self.run_timeout, run).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(task = %task_id, "Run aborted: {}", e);
                let failed =
                    ErrorRecord::fatal("runtime", ErrorKind::Stage, format!("run aborted: {}", e));
                PipelineResult::rejected(failed, &platform, None, started.elapsed())
            }
            Err(_) => {
                // The blocking thread cannot be cancelled; its result is dropped
                // and its slot freed when it returns
                tracing::warn!(
                    task = %task_id,
                    budget_secs = self.run_timeout.as_secs_f64(),
                    "Run timed out"
                );
                PipelineResult::timed_out(&platform, self.run_timeout)
            }
        };

        tracing::info!(
            task = %task_id,
            status = %result.status,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Task finished"
        );
        self.store_final(record.finish(result, self.result_ttl)).await;
    }

    async fn store_final(&self, record: TaskRecord) {
        if let Err(e) = self.store.put(&record).await {
            tracing::error!(task = %record.task_id, "Failed to record task outcome: {:#}", e);
        }
    }
}
