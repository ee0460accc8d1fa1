// src/users/routes.rs

use axum::{routing::get, Router};

use super::handlers;

pub fn users_routes() -> Router {
    Router::new().route(
        "/api/users/me",
        get(handlers::get_profile).put(handlers::update_profile),
    )
}
