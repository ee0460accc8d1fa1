// src/queue/job.rs
//! Job records and per-queue options

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueName {
    #[serde(rename = "plan-generation")]
    PlanGeneration,
    #[serde(rename = "tts-generation")]
    TtsGeneration,
    #[serde(rename = "image-generation")]
    ImageGeneration,
    #[serde(rename = "pdf-generation")]
    PdfGeneration,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::PlanGeneration,
        QueueName::TtsGeneration,
        QueueName::ImageGeneration,
        QueueName::PdfGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::PlanGeneration => "plan-generation",
            QueueName::TtsGeneration => "tts-generation",
            QueueName::ImageGeneration => "image-generation",
            QueueName::PdfGeneration => "pdf-generation",
        }
    }

    /// Retry, backoff and worker settings each queue runs with
    pub fn default_options(&self) -> JobOptions {
        match self {
            QueueName::PlanGeneration => JobOptions::new(3, 2000, 2),
            QueueName::TtsGeneration => JobOptions::new(2, 1000, 3),
            QueueName::ImageGeneration => JobOptions::new(2, 1000, 2),
            QueueName::PdfGeneration => JobOptions::new(2, 1000, 2),
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    /// Accepts the full queue name or its short form (`tts`, `image`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan-generation" | "plan" | "plans" => Ok(QueueName::PlanGeneration),
            "tts-generation" | "tts" => Ok(QueueName::TtsGeneration),
            "image-generation" | "image" | "images" => Ok(QueueName::ImageGeneration),
            "pdf-generation" | "pdf" => Ok(QueueName::PdfGeneration),
            other => Err(format!("unknown queue '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Total attempts including the first run
    pub attempts: u32,
    /// Base delay for exponential backoff
    pub backoff_ms: u64,
    pub concurrency: usize,
    pub keep_completed: usize,
    pub keep_failed: usize,
}

impl JobOptions {
    pub fn new(attempts: u32, backoff_ms: u64, concurrency: usize) -> Self {
        Self {
            attempts,
            backoff_ms,
            concurrency,
            keep_completed: 10,
            keep_failed: 50,
        }
    }

    /// Delay before retry number `attempts_made` (1-based): base * 2^(n-1)
    pub fn backoff_delay_ms(&self, attempts_made: u32) -> u64 {
        let exponent = attempts_made.saturating_sub(1).min(20);
        self.backoff_ms.saturating_mul(1u64 << exponent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Delayed => "delayed",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub queue: QueueName,
    pub name: String,
    pub data: Value,
    pub state: JobState,
    pub progress: u8,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub failed_reason: Option<String>,
    pub return_value: Option<Value>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub processed_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl JobRecord {
    pub fn new(id: String, queue: QueueName, name: &str, data: Value, max_attempts: u32) -> Self {
        Self {
            id,
            queue,
            name: name.to_string(),
            data,
            state: JobState::Waiting,
            progress: 0,
            attempts_made: 0,
            max_attempts,
            failed_reason: None,
            return_value: None,
            created_at: now_ms(),
            processed_at: None,
            finished_at: None,
        }
    }

    /// True when the attempt currently running is the last one allowed
    pub fn is_final_attempt(&self) -> bool {
        self.attempts_made + 1 >= self.max_attempts
    }

    /// Reads a string field from the payload
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Number of jobs in each state for one queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_options() {
        let plan = QueueName::PlanGeneration.default_options();
        assert_eq!((plan.attempts, plan.backoff_ms, plan.concurrency), (3, 2000, 2));

        let tts = QueueName::TtsGeneration.default_options();
        assert_eq!((tts.attempts, tts.backoff_ms, tts.concurrency), (2, 1000, 3));

        for queue in QueueName::ALL {
            let options = queue.default_options();
            assert_eq!(options.keep_completed, 10);
            assert_eq!(options.keep_failed, 50);
        }
    }

    #[test]
    fn test_exponential_backoff() {
        let options = QueueName::PlanGeneration.default_options();
        assert_eq!(options.backoff_delay_ms(1), 2000);
        assert_eq!(options.backoff_delay_ms(2), 4000);
        assert_eq!(options.backoff_delay_ms(3), 8000);
    }

    #[test]
    fn test_queue_name_aliases() {
        assert_eq!("tts".parse::<QueueName>().unwrap(), QueueName::TtsGeneration);
        assert_eq!(
            "image-generation".parse::<QueueName>().unwrap(),
            QueueName::ImageGeneration
        );
        assert!("email".parse::<QueueName>().is_err());
    }

    #[test]
    fn test_record_serializes_queue_and_state_as_strings() {
        let record = JobRecord::new(
            "7".to_string(),
            QueueName::PdfGeneration,
            "generate-pdf",
            serde_json::json!({"planId": "P_1"}),
            2,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["queue"], "pdf-generation");
        assert_eq!(value["state"], "waiting");
        assert_eq!(value["attemptsMade"], 0);
        assert_eq!(record.data_str("planId"), Some("P_1"));
    }

    #[test]
    fn test_final_attempt() {
        let mut record = JobRecord::new(
            "1".to_string(),
            QueueName::PlanGeneration,
            "generate-plan",
            Value::Null,
            3,
        );
        assert!(!record.is_final_attempt());
        record.attempts_made = 2;
        assert!(record.is_final_attempt());
    }
}
