// src/plans/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

pub fn plans_routes() -> Router {
    Router::new()
        .route("/api/plans", get(handlers::list_plans))
        .route("/api/plans/generate", post(handlers::generate_plan))
        .route("/api/plans/status/:job_id", get(handlers::job_status))
        .route("/api/plans/:id", get(handlers::get_plan))
        .route("/api/plans/:id/regenerate", post(handlers::regenerate_plan))
}
