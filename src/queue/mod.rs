// src/queue/mod.rs
//! Named job queues with retry/backoff, backed by a [`JobStore`].

pub mod job;
pub mod memory_store;
pub mod redis_store;
pub mod store;

#[cfg(test)]
mod tests;

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub use job::{JobCounts, JobOptions, JobRecord, JobState, QueueName};
pub use memory_store::MemoryJobStore;
pub use redis_store::RedisJobStore;
pub use store::{JobStore, QueueError};

use crate::common::config::{AppConfig, QueueBackend};

const REDIS_KEY_PREFIX: &str = "fitcoach:queue";

/// What happened to a job whose handler returned an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Parked in the delayed set; runs again after `delay_ms`
    Retrying { delay_ms: u64 },
    /// No attempts left; the job is in the failed list
    Exhausted,
}

#[derive(Clone)]
pub struct JobQueue {
    name: QueueName,
    options: JobOptions,
    store: Arc<dyn JobStore>,
}

impl JobQueue {
    pub fn new(name: QueueName, options: JobOptions, store: Arc<dyn JobStore>) -> Self {
        Self {
            name,
            options,
            store,
        }
    }

    pub fn name(&self) -> QueueName {
        self.name
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Enqueues a job and returns its record (state `waiting`)
    pub async fn add(&self, job_name: &str, data: Value) -> Result<JobRecord, QueueError> {
        let id = self.store.next_id(self.name).await?;
        let record = JobRecord::new(id, self.name, job_name, data, self.options.attempts);
        self.store.enqueue(&record).await?;
        debug!(queue = %self.name, job_id = %record.id, name = %job_name, "Job added");
        Ok(record)
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<JobRecord>, QueueError> {
        self.store.get(self.name, id).await
    }

    pub async fn update_progress(&self, record: &mut JobRecord, progress: u8) -> Result<(), QueueError> {
        record.progress = progress.min(100);
        self.store.save(record).await
    }

    pub async fn counts(&self) -> Result<JobCounts, QueueError> {
        self.store.counts(self.name).await
    }

    /// Promotes due delayed jobs, then reserves the next waiting one
    pub async fn take(&self) -> Result<Option<JobRecord>, QueueError> {
        self.store.promote_delayed(self.name, job::now_ms()).await?;
        self.store.reserve(self.name).await
    }

    pub async fn complete(&self, mut record: JobRecord, return_value: Value) -> Result<(), QueueError> {
        record.attempts_made += 1;
        record.state = JobState::Completed;
        record.progress = 100;
        record.return_value = Some(return_value);
        record.failed_reason = None;
        record.finished_at = Some(job::now_ms());
        self.store.finish(&record, self.options.keep_completed).await
    }

    /// Records a failed attempt and either schedules a retry with
    /// exponential backoff or moves the job to the failed list.
    pub async fn fail(&self, mut record: JobRecord, reason: &str) -> Result<FailureOutcome, QueueError> {
        record.attempts_made += 1;
        record.failed_reason = Some(reason.to_string());

        if record.attempts_made < record.max_attempts {
            let delay_ms = self.options.backoff_delay_ms(record.attempts_made);
            let run_at = job::now_ms() + delay_ms as i64;
            self.store.schedule_retry(&record, run_at).await?;
            return Ok(FailureOutcome::Retrying { delay_ms });
        }

        record.state = JobState::Failed;
        record.finished_at = Some(job::now_ms());
        self.store.finish(&record, self.options.keep_failed).await?;
        Ok(FailureOutcome::Exhausted)
    }
}

/// The four queues the service runs
#[derive(Clone)]
pub struct Queues {
    pub plan_generation: JobQueue,
    pub tts: JobQueue,
    pub image: JobQueue,
    pub pdf: JobQueue,
    store: Arc<dyn JobStore>,
}

impl Queues {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        let queue = |name: QueueName| JobQueue::new(name, name.default_options(), store.clone());
        Self {
            plan_generation: queue(QueueName::PlanGeneration),
            tts: queue(QueueName::TtsGeneration),
            image: queue(QueueName::ImageGeneration),
            pdf: queue(QueueName::PdfGeneration),
            store,
        }
    }

    /// Connects the store selected by `QUEUE_BACKEND`
    pub async fn from_config(config: &AppConfig) -> Result<Self, QueueError> {
        let store: Arc<dyn JobStore> = match config.queue_backend {
            QueueBackend::Redis => {
                let store = RedisJobStore::connect(&config.redis_url, REDIS_KEY_PREFIX).await?;
                info!("Job queues using Redis");
                Arc::new(store)
            }
            QueueBackend::Memory => {
                info!("Job queues using in-process memory store");
                Arc::new(MemoryJobStore::new())
            }
        };
        Ok(Self::new(store))
    }

    pub fn get(&self, name: QueueName) -> &JobQueue {
        match name {
            QueueName::PlanGeneration => &self.plan_generation,
            QueueName::TtsGeneration => &self.tts,
            QueueName::ImageGeneration => &self.image,
            QueueName::PdfGeneration => &self.pdf,
        }
    }

    pub fn all(&self) -> [&JobQueue; 4] {
        [&self.plan_generation, &self.tts, &self.image, &self.pdf]
    }

    pub async fn ping(&self) -> Result<(), QueueError> {
        self.store.ping().await
    }
}
