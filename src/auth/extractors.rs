//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::tokens::verify_access_token;
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Validates the Bearer access token and loads the user. A missing or
/// malformed header is rejected before the database is touched.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Unauthorized("Access token required".into()));
        };

        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let claims = match verify_access_token(&app_state.config.jwt, &token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "JWT token validation failed");
                return Err(ApiError::Unauthorized("Invalid token".into()));
            }
        };

        let user: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, email, name FROM users WHERE id = ?")
                .bind(&claims.sub)
                .fetch_optional(&app_state.db)
                .await
                .map_err(|e| {
                    error!(
                        error = %e,
                        user_id = %claims.sub,
                        "Database error during user lookup in authentication"
                    );
                    ApiError::DatabaseError(e)
                })?;

        match user {
            Some((id, email, name)) => {
                let is_admin = app_state.config.is_admin_email(&email);
                debug!(
                    user_id = %id,
                    email = %safe_email_log(&email),
                    is_admin = is_admin,
                    "User authenticated"
                );
                Ok(AuthedUser {
                    id,
                    email,
                    name,
                    is_admin,
                })
            }
            None => {
                warn!(user_id = %claims.sub, "Authentication failed: user not found");
                Err(ApiError::Unauthorized("Invalid token".into()))
            }
        }
    }
}

/// An [`AuthedUser`] whose email is listed in `ADMIN_EMAILS`
#[derive(Debug)]
pub struct AdminUser(pub AuthedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            warn!(user_id = %user.id, "Admin access denied");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
