//! Authentication routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/register` - Create an account
/// - `POST /api/auth/login` - Email/password sign-in
/// - `POST /api/auth/refresh` - Rotate the refresh token
/// - `POST /api/auth/forgot-password` - Email a reset link
/// - `POST /api/auth/reset-password` - Complete a reset
/// - `POST /api/auth/logout` - Revoke a refresh token
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/refresh", post(handlers::refresh))
        .route("/api/auth/forgot-password", post(handlers::forgot_password))
        .route("/api/auth/reset-password", post(handlers::reset_password))
        .route("/api/auth/logout", post(handlers::logout))
}
