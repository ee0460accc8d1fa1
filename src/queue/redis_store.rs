// src/queue/redis_store.rs
//! Redis-backed job store.
//!
//! Key layout per queue (`{prefix}:{queue}:...`):
//! - `id`         INCR counter for job ids
//! - `job:{id}`   JSON job record
//! - `wait`       list, new ids LPUSHed, reserved from the right
//! - `active`     list of ids being processed
//! - `delayed`    sorted set scored by run-at millis
//! - `completed`  / `failed` lists, newest first, trimmed to the keep count

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use super::job::{now_ms, JobCounts, JobRecord, JobState, QueueName};
use super::store::{JobStore, QueueError};

const PROMOTE_BATCH: isize = 100;

#[derive(Clone)]
pub struct RedisJobStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisJobStore {
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, queue: QueueName, suffix: &str) -> String {
        format!("{}:{}:{}", self.prefix, queue.as_str(), suffix)
    }

    fn job_key(&self, queue: QueueName, id: &str) -> String {
        format!("{}:{}:job:{}", self.prefix, queue.as_str(), id)
    }

    async fn load(&self, queue: QueueName, id: &str) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.job_key(queue, id))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn next_id(&self, queue: QueueName) -> Result<String, QueueError> {
        let mut conn = self.conn.clone();
        let id: u64 = redis::cmd("INCR")
            .arg(self.key(queue, "id"))
            .query_async(&mut conn)
            .await?;
        Ok(id.to_string())
    }

    async fn enqueue(&self, record: &JobRecord) -> Result<(), QueueError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(self.job_key(record.queue, &record.id))
            .arg(json)
            .ignore()
            .cmd("LPUSH")
            .arg(self.key(record.queue, "wait"))
            .arg(&record.id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, queue: QueueName, id: &str) -> Result<Option<JobRecord>, QueueError> {
        self.load(queue, id).await
    }

    async fn save(&self, record: &JobRecord) -> Result<(), QueueError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        // XX: never resurrect a record that retention already evicted
        let stored: Option<String> = redis::cmd("SET")
            .arg(self.job_key(record.queue, &record.id))
            .arg(json)
            .arg("XX")
            .query_async(&mut conn)
            .await?;
        match stored {
            Some(_) => Ok(()),
            None => Err(QueueError::NotFound(record.id.clone())),
        }
    }

    async fn reserve(&self, queue: QueueName) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.conn.clone();
        // Non-blocking pop; the worker loop polls
        let id: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(self.key(queue, "wait"))
            .arg(self.key(queue, "active"))
            .query_async(&mut conn)
            .await?;

        let Some(id) = id else {
            return Ok(None);
        };

        let Some(mut record) = self.load(queue, &id).await? else {
            warn!(queue = %queue, job_id = %id, "Dropping job id with no stored record");
            redis::cmd("LREM")
                .arg(self.key(queue, "active"))
                .arg(0)
                .arg(&id)
                .query_async::<i64>(&mut conn)
                .await?;
            return Ok(None);
        };

        record.state = JobState::Active;
        record.processed_at = Some(now_ms());
        self.save(&record).await?;
        Ok(Some(record))
    }

    async fn promote_delayed(&self, queue: QueueName, now_ms: i64) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let delayed_key = self.key(queue, "delayed");
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&delayed_key)
            .arg("-inf")
            .arg(now_ms)
            .arg("LIMIT")
            .arg(0)
            .arg(PROMOTE_BATCH)
            .query_async(&mut conn)
            .await?;

        let mut promoted = 0;
        for id in due {
            // Only the worker whose ZREM succeeds moves the job
            let removed: i64 = redis::cmd("ZREM")
                .arg(&delayed_key)
                .arg(&id)
                .query_async(&mut conn)
                .await?;
            if removed != 1 {
                continue;
            }

            if let Some(mut record) = self.load(queue, &id).await? {
                record.state = JobState::Waiting;
                self.save(&record).await?;
                redis::cmd("LPUSH")
                    .arg(self.key(queue, "wait"))
                    .arg(&id)
                    .query_async::<i64>(&mut conn)
                    .await?;
                promoted += 1;
            }
        }

        if promoted > 0 {
            debug!(queue = %queue, promoted = promoted, "Promoted delayed jobs");
        }
        Ok(promoted)
    }

    async fn schedule_retry(&self, record: &JobRecord, run_at_ms: i64) -> Result<(), QueueError> {
        let mut delayed = record.clone();
        delayed.state = JobState::Delayed;
        let json = serde_json::to_string(&delayed)?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("LREM")
            .arg(self.key(record.queue, "active"))
            .arg(0)
            .arg(&record.id)
            .ignore()
            .cmd("SET")
            .arg(self.job_key(record.queue, &record.id))
            .arg(json)
            .ignore()
            .cmd("ZADD")
            .arg(self.key(record.queue, "delayed"))
            .arg(run_at_ms)
            .arg(&record.id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn finish(&self, record: &JobRecord, keep: usize) -> Result<(), QueueError> {
        let list = if record.state == JobState::Completed {
            "completed"
        } else {
            "failed"
        };
        let list_key = self.key(record.queue, list);
        let json = serde_json::to_string(record)?;

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("LREM")
            .arg(self.key(record.queue, "active"))
            .arg(0)
            .arg(&record.id)
            .ignore()
            .cmd("SET")
            .arg(self.job_key(record.queue, &record.id))
            .arg(json)
            .ignore()
            .cmd("LPUSH")
            .arg(&list_key)
            .arg(&record.id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        // Retention: drop ids past the keep count along with their records
        let evicted: Vec<String> = redis::cmd("LRANGE")
            .arg(&list_key)
            .arg(keep)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        if !evicted.is_empty() {
            let mut pipe = redis::pipe();
            pipe.atomic()
                .cmd("LTRIM")
                .arg(&list_key)
                .arg(0)
                .arg(keep as isize - 1)
                .ignore();
            for id in &evicted {
                pipe.cmd("DEL").arg(self.job_key(record.queue, id)).ignore();
            }
            pipe.query_async::<()>(&mut conn).await?;
        }
        Ok(())
    }

    async fn counts(&self, queue: QueueName) -> Result<JobCounts, QueueError> {
        let mut conn = self.conn.clone();
        let (waiting, active, completed, failed, delayed): (u64, u64, u64, u64, u64) =
            redis::pipe()
                .cmd("LLEN")
                .arg(self.key(queue, "wait"))
                .cmd("LLEN")
                .arg(self.key(queue, "active"))
                .cmd("LLEN")
                .arg(self.key(queue, "completed"))
                .cmd("LLEN")
                .arg(self.key(queue, "failed"))
                .cmd("ZCARD")
                .arg(self.key(queue, "delayed"))
                .query_async(&mut conn)
                .await?;
        Ok(JobCounts {
            waiting,
            active,
            completed,
            failed,
            delayed,
        })
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
