// src/ai/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

pub fn ai_routes() -> Router {
    Router::new()
        .route("/api/ai/tts", post(handlers::generate_tts))
        .route("/api/ai/images", post(handlers::generate_image))
        .route("/api/ai/jobs/:queue/:job_id", get(handlers::job_status))
}
