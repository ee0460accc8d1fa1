//! Authentication handlers

use axum::{body::Bytes, extract::Extension, http::StatusCode, Json};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::models::{
    AuthResponse, Credentials, ForgotPasswordRequest, LoginRequest, MessageResponse,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair, UserSummary,
};
use super::tokens::{
    hash_password, is_expired, issue_access_token, issue_refresh_token, verify_password,
    verify_refresh_token,
};
use super::validators::{LoginValidator, RegisterValidator, ResetPasswordValidator};
use crate::common::config::JwtConfig;
use crate::common::helpers::safe_token_log;
use crate::common::{
    generate_token_id, generate_user_id, safe_email_log, ApiError, ApiJson, AppState, Validator,
};

const RESET_REQUESTED_MESSAGE: &str = "If the email exists, a reset link has been sent";
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Issues an access/refresh pair and stores the refresh token. Runs on any
/// executor so rotation can reuse it inside a transaction.
async fn issue_token_pair<'e, E>(executor: E, jwt: &JwtConfig, user_id: &str) -> Result<TokenPair, ApiError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let access = issue_access_token(jwt, user_id)?;
    let refresh = issue_refresh_token(jwt, user_id)?;

    sqlx::query(
        "INSERT INTO refresh_tokens (id, token, user_id, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(generate_token_id())
    .bind(&refresh.token)
    .bind(user_id)
    .bind(refresh.expires_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(TokenPair {
        access_token: access.token,
        refresh_token: refresh.token,
    })
}

async fn find_credentials(db: &SqlitePool, email: &str) -> Result<Option<Credentials>, ApiError> {
    let user = sqlx::query_as::<_, Credentials>(
        "SELECT id, email, name, password_hash, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// POST /api/auth/register
///
/// Creates the account and signs the user in.
pub async fn register(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let state = state_lock.read().await.clone();
    RegisterValidator.validate(&payload).into_result()?;

    let email = normalize_email(&payload.email);
    if find_credentials(&state.db, &email).await?.is_some() {
        warn!(email = %safe_email_log(&email), "Registration rejected: email already in use");
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost).await?;
    let user_id = generate_user_id();

    sqlx::query("INSERT INTO users (id, email, password_hash, name) VALUES (?, ?, ?, ?)")
        .bind(&user_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(payload.name.trim())
        .execute(&state.db)
        .await?;

    let user = find_credentials(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::InternalServer("user missing after insert".to_string()))?;
    let tokens = issue_token_pair(&state.db, &state.config.jwt, &user.id).await?;

    info!(user_id = %user.id, email = %safe_email_log(&email), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserSummary::from(&user),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    LoginValidator.validate(&payload).into_result()?;

    let email = normalize_email(&payload.email);
    let Some(user) = find_credentials(&state.db, &email).await? else {
        warn!(email = %safe_email_log(&email), "Login failed: unknown email");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    if !verify_password(&payload.password, &user.password_hash).await? {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let tokens = issue_token_pair(&state.db, &state.config.jwt, &user.id).await?;
    info!(user_id = %user.id, email = %safe_email_log(&email), "User logged in");

    Ok(Json(AuthResponse {
        user: UserSummary::from(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// POST /api/auth/refresh
///
/// Rotates the refresh token: the presented one is deleted and a new pair
/// issued in the same transaction. A token that was already rotated away
/// fails with 401.
pub async fn refresh(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let state = state_lock.read().await.clone();

    let Some(token) = payload.refresh_token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::Unauthorized("Refresh token required".to_string()));
    };

    let mut tx = state.db.begin().await?;

    let stored: Option<(String, String, String)> =
        sqlx::query_as("SELECT id, user_id, expires_at FROM refresh_tokens WHERE token = ?")
            .bind(&token)
            .fetch_optional(&mut *tx)
            .await?;

    let Some((token_id, user_id, expires_at)) = stored else {
        warn!(token = %safe_token_log(&token), "Refresh rejected: unknown token");
        return Err(ApiError::Unauthorized("Invalid or expired refresh token".to_string()));
    };
    if is_expired(&expires_at) {
        warn!(user_id = %user_id, "Refresh rejected: token expired");
        return Err(ApiError::Unauthorized("Invalid or expired refresh token".to_string()));
    }

    match verify_refresh_token(&state.config.jwt, &token) {
        Ok(claims) if claims.sub == user_id => {}
        Ok(_) => {
            warn!(user_id = %user_id, "Refresh rejected: subject mismatch");
            return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
        }
        Err(e) => {
            warn!(error = %e, user_id = %user_id, "Refresh rejected: signature check failed");
            return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
        }
    }

    let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
        .bind(&token_id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() != 1 {
        return Err(ApiError::Unauthorized("Invalid or expired refresh token".to_string()));
    }

    let tokens = issue_token_pair(&mut *tx, &state.config.jwt, &user_id).await?;
    tx.commit().await?;

    info!(user_id = %user_id, "Refresh token rotated");
    Ok(Json(tokens))
}

/// POST /api/auth/forgot-password
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let email = normalize_email(&payload.email);

    let Some(user) = find_credentials(&state.db, &email).await? else {
        info!(email = %safe_email_log(&email), "Password reset requested for unknown email");
        return Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)));
    };

    let reset_token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    sqlx::query(
        "INSERT INTO password_reset_tokens (id, token, user_id, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(generate_token_id())
    .bind(&reset_token)
    .bind(&user.id)
    .bind(expires_at.to_rfc3339())
    .execute(&state.db)
    .await?;

    let reset_link = format!(
        "{}/reset-password?token={}",
        state.config.frontend_url.trim_end_matches('/'),
        urlencoding::encode(&reset_token)
    );

    if let Err(e) = state.email.send_password_reset(&user.email, &reset_link).await {
        error!(error = %e, user_id = %user.id, "Failed to send password reset email");
    }

    info!(user_id = %user.id, email = %safe_email_log(&email), "Password reset requested");
    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// POST /api/auth/reset-password
///
/// Sets the new password, burns the token and signs the user out everywhere.
pub async fn reset_password(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    ResetPasswordValidator.validate(&payload).into_result()?;

    let invalid = || ApiError::BadRequest("Invalid or expired reset token".to_string());

    let stored: Option<(String, String, String, bool)> = sqlx::query_as(
        "SELECT id, user_id, expires_at, used FROM password_reset_tokens WHERE token = ?",
    )
    .bind(&payload.token)
    .fetch_optional(&state.db)
    .await?;

    let Some((token_id, user_id, expires_at, used)) = stored else {
        return Err(invalid());
    };
    if used || is_expired(&expires_at) {
        warn!(user_id = %user_id, used = used, "Reset rejected: token used or expired");
        return Err(invalid());
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost).await?;

    let mut tx = state.db.begin().await?;

    let claimed = sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE id = ? AND used = 0")
        .bind(&token_id)
        .execute(&mut *tx)
        .await?;
    if claimed.rows_affected() != 1 {
        return Err(invalid());
    }

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?")
        .bind(&password_hash)
        .bind(&user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(&user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(user_id = %user_id, "Password reset completed");
    Ok(Json(MessageResponse::new("Password reset successful")))
}

/// POST /api/auth/logout
///
/// Deletes the presented refresh token, if any. The body is optional.
pub async fn logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let token = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|r| r.refresh_token)
        .filter(|t| !t.is_empty());

    if let Some(token) = token {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(&token)
            .execute(&state.db)
            .await?;
        info!(removed = result.rows_affected(), "Logout: refresh token revoked");
    }

    Ok(Json(MessageResponse::new("Logged out successfully")))
}
