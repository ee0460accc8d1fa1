// src/admin/handlers/dashboard.rs

use axum::{extract::Extension, Json};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::admin::models::{
    success_rate, PlanStats, QueueStats, QueueStatsResponse, SystemStats, UserStats,
};
use crate::auth::AdminUser;
use crate::common::{ApiError, AppState};

async fn count(db: &SqlitePool, sql: &str, what: &str) -> Result<i64, ApiError> {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error counting {} for admin stats", what);
            ApiError::DatabaseError(e)
        })
}

/// GET /api/admin/jobs - Job counts per queue
pub async fn get_job_counts(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<QueueStatsResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    info!(admin_user_id = %admin.id, "Fetching queue statistics");

    let mut queues = Vec::new();
    for queue in state.queues.all() {
        let counts = queue.counts().await?;
        queues.push(QueueStats {
            name: queue.name().as_str(),
            counts,
        });
    }

    Ok(Json(QueueStatsResponse { queues }))
}

/// GET /api/admin/stats - User and plan totals
pub async fn get_stats(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<SystemStats>, ApiError> {
    let state = state_lock.read().await.clone();
    info!(admin_user_id = %admin.id, "Fetching system statistics");

    let users = count(&state.db, "SELECT COUNT(*) FROM users", "users").await?;
    let total = count(&state.db, "SELECT COUNT(*) FROM plans", "plans").await?;
    let completed = count(
        &state.db,
        "SELECT COUNT(*) FROM plans WHERE status = 'completed'",
        "completed plans",
    )
    .await?;
    let failed = count(
        &state.db,
        "SELECT COUNT(*) FROM plans WHERE status = 'failed'",
        "failed plans",
    )
    .await?;
    // created_at is UTC text, so today starts at UTC midnight
    let today = count(
        &state.db,
        "SELECT COUNT(*) FROM plans WHERE created_at >= date('now')",
        "today's plans",
    )
    .await?;

    Ok(Json(SystemStats {
        users: UserStats { total: users },
        plans: PlanStats {
            total,
            completed,
            failed,
            today,
            success_rate: success_rate(completed, total),
        },
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
}
