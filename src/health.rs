// src/health.rs
//! Unauthenticated liveness and readiness probes

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::common::AppState;

const OK: &str = "ok";
const ERROR: &str = "error";

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub database: &'static str,
    pub queue: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn check_database(state: &AppState) -> Result<(), String> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

async fn check_queue(state: &AppState) -> Result<(), String> {
    state.queues.ping().await.map_err(|e| e.to_string())
}

/// GET /healthz - Per-dependency status, 503 when any is down
pub async fn healthz(Extension(state_lock): Extension<Arc<RwLock<AppState>>>) -> Response {
    let state = state_lock.read().await.clone();

    let database = match check_database(&state).await {
        Ok(()) => OK,
        Err(e) => {
            warn!(error = %e, "Health check: database unavailable");
            ERROR
        }
    };
    let queue = match check_queue(&state).await {
        Ok(()) => OK,
        Err(e) => {
            warn!(error = %e, "Health check: queue backend unavailable");
            ERROR
        }
    };

    let healthy = database == OK && queue == OK;
    let body = HealthResponse {
        status: if healthy { OK } else { ERROR },
        timestamp: timestamp(),
        services: ServiceHealth { database, queue },
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}

/// GET /ready
pub async fn ready(Extension(state_lock): Extension<Arc<RwLock<AppState>>>) -> Response {
    let state = state_lock.read().await.clone();

    let checked = match check_database(&state).await {
        Ok(()) => check_queue(&state).await,
        Err(e) => Err(e),
    };

    match checked {
        Ok(()) => Json(ReadyResponse {
            status: "ready",
            timestamp: timestamp(),
            error: None,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "not ready",
                    timestamp: timestamp(),
                    error: Some(e),
                }),
            )
                .into_response()
        }
    }
}

pub fn health_routes() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ready", get(ready))
}
