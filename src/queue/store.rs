// src/queue/store.rs
//! Storage seam for job queues

use async_trait::async_trait;

use super::job::{JobCounts, JobRecord, QueueName};
use crate::common::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt job record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job {0} not found")]
    NotFound(String),
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            QueueError::Redis(e) => {
                ApiError::ServiceUnavailable(format!("Job queue unavailable: {}", e))
            }
            QueueError::Serialization(e) => ApiError::InternalServer(e.to_string()),
        }
    }
}

/// Persistence for job records and the per-state id collections.
///
/// Every job lives in exactly one of: the wait list, the active list, the
/// delayed set, or one of the bounded completed/failed lists.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Allocates the next job id for a queue
    async fn next_id(&self, queue: QueueName) -> Result<String, QueueError>;

    /// Stores a new record and appends it to the wait list
    async fn enqueue(&self, record: &JobRecord) -> Result<(), QueueError>;

    async fn get(&self, queue: QueueName, id: &str) -> Result<Option<JobRecord>, QueueError>;

    /// Overwrites a record without moving it between states
    async fn save(&self, record: &JobRecord) -> Result<(), QueueError>;

    /// Moves the oldest waiting job to the active list and returns it
    /// marked active.
    async fn reserve(&self, queue: QueueName) -> Result<Option<JobRecord>, QueueError>;

    /// Moves delayed jobs whose run time has passed back to the wait list
    async fn promote_delayed(&self, queue: QueueName, now_ms: i64) -> Result<usize, QueueError>;

    /// Removes an active job and parks it in the delayed set until `run_at_ms`
    async fn schedule_retry(&self, record: &JobRecord, run_at_ms: i64) -> Result<(), QueueError>;

    /// Removes an active job and records it as completed or failed (taken
    /// from `record.state`), keeping at most `keep` finished records.
    async fn finish(&self, record: &JobRecord, keep: usize) -> Result<(), QueueError>;

    async fn counts(&self, queue: QueueName) -> Result<JobCounts, QueueError>;

    /// Cheap liveness check of the backing store
    async fn ping(&self) -> Result<(), QueueError>;
}
