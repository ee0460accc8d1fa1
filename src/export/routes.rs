// src/export/routes.rs

use axum::{routing::post, Router};

use super::handlers;

pub fn export_routes() -> Router {
    Router::new().route("/api/export/pdf", post(handlers::export_pdf))
}
