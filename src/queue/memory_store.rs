// src/queue/memory_store.rs
//! In-process job store for development and tests

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::Mutex;

use super::job::{JobCounts, JobRecord, JobState, QueueName};
use super::store::{JobStore, QueueError};

#[derive(Default)]
struct QueueLists {
    next_id: u64,
    records: HashMap<String, JobRecord>,
    wait: VecDeque<String>,
    active: Vec<String>,
    /// run-at millis -> ids, ordered by due time
    delayed: BTreeMap<i64, Vec<String>>,
    completed: VecDeque<String>,
    failed: VecDeque<String>,
}

impl QueueLists {
    fn remove_active(&mut self, id: &str) {
        self.active.retain(|a| a != id);
    }
}

/// Keeps every queue in a single mutex-guarded map
#[derive(Default)]
pub struct MemoryJobStore {
    queues: Mutex<HashMap<QueueName, QueueLists>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn next_id(&self, queue: QueueName) -> Result<String, QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(queue).or_default();
        lists.next_id += 1;
        Ok(lists.next_id.to_string())
    }

    async fn enqueue(&self, record: &JobRecord) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(record.queue).or_default();
        lists.records.insert(record.id.clone(), record.clone());
        lists.wait.push_back(record.id.clone());
        Ok(())
    }

    async fn get(&self, queue: QueueName, id: &str) -> Result<Option<JobRecord>, QueueError> {
        let queues = self.queues.lock().await;
        Ok(queues
            .get(&queue)
            .and_then(|lists| lists.records.get(id))
            .cloned())
    }

    async fn save(&self, record: &JobRecord) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(record.queue).or_default();
        if !lists.records.contains_key(&record.id) {
            return Err(QueueError::NotFound(record.id.clone()));
        }
        lists.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn reserve(&self, queue: QueueName) -> Result<Option<JobRecord>, QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(queue).or_default();

        while let Some(id) = lists.wait.pop_front() {
            if let Some(record) = lists.records.get_mut(&id) {
                record.state = JobState::Active;
                record.processed_at = Some(super::job::now_ms());
                let reserved = record.clone();
                lists.active.push(id);
                return Ok(Some(reserved));
            }
        }
        Ok(None)
    }

    async fn promote_delayed(&self, queue: QueueName, now_ms: i64) -> Result<usize, QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(queue).or_default();

        let later = lists.delayed.split_off(&(now_ms + 1));
        let due = std::mem::replace(&mut lists.delayed, later);

        let mut promoted = 0;
        for id in due.into_values().flatten() {
            if let Some(record) = lists.records.get_mut(&id) {
                record.state = JobState::Waiting;
                lists.wait.push_back(id);
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn schedule_retry(&self, record: &JobRecord, run_at_ms: i64) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(record.queue).or_default();

        lists.remove_active(&record.id);
        let mut delayed = record.clone();
        delayed.state = JobState::Delayed;
        lists.records.insert(record.id.clone(), delayed);
        lists
            .delayed
            .entry(run_at_ms)
            .or_default()
            .push(record.id.clone());
        Ok(())
    }

    async fn finish(&self, record: &JobRecord, keep: usize) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let lists = queues.entry(record.queue).or_default();

        lists.remove_active(&record.id);
        lists.records.insert(record.id.clone(), record.clone());

        let finished = if record.state == JobState::Completed {
            &mut lists.completed
        } else {
            &mut lists.failed
        };
        finished.push_front(record.id.clone());

        let mut evicted = Vec::new();
        while finished.len() > keep {
            if let Some(old) = finished.pop_back() {
                evicted.push(old);
            }
        }
        for id in evicted {
            lists.records.remove(&id);
        }
        Ok(())
    }

    async fn counts(&self, queue: QueueName) -> Result<JobCounts, QueueError> {
        let queues = self.queues.lock().await;
        Ok(queues
            .get(&queue)
            .map(|lists| JobCounts {
                waiting: lists.wait.len() as u64,
                active: lists.active.len() as u64,
                completed: lists.completed.len() as u64,
                failed: lists.failed.len() as u64,
                delayed: lists.delayed.values().map(|ids| ids.len() as u64).sum(),
            })
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
