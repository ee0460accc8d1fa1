// src/admin/models.rs

use serde::Serialize;
use serde_json::Value;

use crate::queue::JobCounts;

/// Job counts for one queue
#[derive(Debug, Serialize)]
pub struct QueueStats {
    pub name: &'static str,
    #[serde(flatten)]
    pub counts: JobCounts,
}

#[derive(Debug, Serialize)]
pub struct QueueStatsResponse {
    pub queues: Vec<QueueStats>,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub today: i64,
    /// Two-decimal percentage string, or the number 0 when there are no plans
    pub success_rate: Value,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub users: UserStats,
    pub plans: PlanStats,
    pub timestamp: String,
}

pub fn success_rate(completed: i64, total: i64) -> Value {
    if total > 0 {
        Value::String(format!("{:.2}", completed as f64 / total as f64 * 100.0))
    } else {
        Value::from(0)
    }
}
