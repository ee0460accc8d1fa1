// src/admin/routes.rs

use axum::{routing::get, Router};

use super::handlers;

pub fn admin_routes() -> Router {
    Router::new()
        .route("/api/admin/jobs", get(handlers::dashboard::get_job_counts))
        .route("/api/admin/stats", get(handlers::dashboard::get_stats))
}
