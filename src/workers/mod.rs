// src/workers/mod.rs
//! Queue consumers
//!
//! Each queue gets `concurrency` tokio tasks. A task promotes due retries,
//! reserves the next waiting job, runs the queue's [`JobHandler`] and records
//! the outcome. Retry and backoff come from the queue options; handlers only
//! decide what a single attempt does.

pub mod image;
pub mod pdf;
pub mod plan_generation;
pub mod tts;


use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::AdapterError;
use crate::common::AppState;
use crate::queue::{FailureOutcome, JobQueue, JobRecord, QueueError, QueueName};
use crate::services::monitoring::capture_job_failure;
use crate::services::pdf::PdfError;
use crate::services::storage::StorageError;

pub use image::ImageWorker;
pub use pdf::PdfWorker;
pub use plan_generation::PlanGenerationWorker;
pub use tts::TtsWorker;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Adapter(#[from] AdapterError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Queue(#[from] QueueError),

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Failed(String),
}

/// What a handler sees while it runs: the shared state and its own queue,
/// for progress updates.
pub struct JobContext<'a> {
    pub state: &'a AppState,
    pub queue: &'a JobQueue,
}

impl JobContext<'_> {
    /// Progress is advisory; a failed write is logged and ignored
    pub async fn progress(&self, job: &mut JobRecord, progress: u8) {
        if let Err(e) = self.queue.update_progress(job, progress).await {
            warn!(error = %e, job_id = %job.id, "Failed to record job progress");
        }
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    fn queue(&self) -> QueueName;

    /// Runs one attempt and returns the job's return value
    async fn handle(&self, ctx: &JobContext<'_>, job: &mut JobRecord) -> Result<Value, WorkerError>;

    /// Called once after the last attempt failed
    async fn on_exhausted(&self, _ctx: &JobContext<'_>, _job: &JobRecord, _reason: &str) {}
}

pub fn parse_payload<T: serde::de::DeserializeOwned>(job: &JobRecord) -> Result<T, WorkerError> {
    serde_json::from_value(job.data.clone()).map_err(|e| WorkerError::InvalidPayload(e.to_string()))
}

/// How one processed job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying { delay_ms: u64 },
    Failed,
}

/// Runs a reserved job through its handler and settles it in the queue
pub async fn process_job(
    state: &AppState,
    queue: &JobQueue,
    handler: &dyn JobHandler,
    mut job: JobRecord,
) -> Result<JobOutcome, QueueError> {
    let ctx = JobContext { state, queue };
    debug!(queue = %queue.name(), job_id = %job.id, attempt = job.attempts_made + 1, "Processing job");

    match handler.handle(&ctx, &mut job).await {
        Ok(return_value) => {
            let job_id = job.id.clone();
            queue.complete(job, return_value).await?;
            info!("Job {} completed in queue {}", job_id, queue.name());
            Ok(JobOutcome::Completed)
        }
        Err(e) => {
            let reason = e.to_string();
            let snapshot = job.clone();
            match queue.fail(job, &reason).await? {
                FailureOutcome::Retrying { delay_ms } => {
                    warn!(
                        queue = %queue.name(),
                        job_id = %snapshot.id,
                        delay_ms = delay_ms,
                        error = %reason,
                        "Job attempt failed, retrying"
                    );
                    Ok(JobOutcome::Retrying { delay_ms })
                }
                FailureOutcome::Exhausted => {
                    error!(error = %reason, "Job {} failed in queue {}", snapshot.id, queue.name());
                    handler.on_exhausted(&ctx, &snapshot, &reason).await;
                    capture_job_failure(queue.name().as_str(), &snapshot.id, &reason);
                    Ok(JobOutcome::Failed)
                }
            }
        }
    }
}

async fn run_worker(
    state: AppState,
    handler: Arc<dyn JobHandler>,
    worker_index: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let queue = state.queues.get(handler.queue()).clone();
    debug!(queue = %queue.name(), worker = worker_index, "Worker started");

    while !*shutdown.borrow() {
        match queue.take().await {
            Ok(Some(job)) => {
                if let Err(e) = process_job(&state, &queue, handler.as_ref(), job).await {
                    error!(error = %e, queue = %queue.name(), "Failed to settle job");
                }
            }
            Ok(None) => {
                tokio::select! {
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "Worker error in {}", queue.name());
                tokio::select! {
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    debug!(queue = %queue.name(), worker = worker_index, "Worker stopped");
}

/// Running worker tasks for every queue
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(state: AppState, handlers: Vec<Arc<dyn JobHandler>>) -> Self {
        let (shutdown, receiver) = watch::channel(false);
        let mut tasks = Vec::new();

        for handler in handlers {
            let concurrency = state.queues.get(handler.queue()).options().concurrency;
            for worker_index in 0..concurrency {
                tasks.push(tokio::spawn(run_worker(
                    state.clone(),
                    handler.clone(),
                    worker_index,
                    receiver.clone(),
                )));
            }
            info!(queue = %handler.queue(), concurrency = concurrency, "Queue workers started");
        }

        Self { shutdown, tasks }
    }

    /// Workers for all four queues
    pub fn start_all(state: AppState) -> Self {
        Self::start(state, default_handlers())
    }

    /// Stops reserving new jobs and waits for in-flight ones to settle
    pub async fn shutdown(self) {
        info!("Shutting down workers gracefully");
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Workers stopped");
    }
}

pub fn default_handlers() -> Vec<Arc<dyn JobHandler>> {
    vec![
        Arc::new(PlanGenerationWorker),
        Arc::new(TtsWorker),
        Arc::new(ImageWorker),
        Arc::new(PdfWorker),
    ]
}
