// src/users/handlers.rs

use axum::extract::{Extension, Json};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use super::models::{ProfileResponse, UpdateProfileRequest, UserProfile};
use super::validators::UpdateProfileValidator;
use crate::auth::AuthedUser;
use crate::common::{ApiError, ApiJson, AppState, Validator};

const PROFILE_COLUMNS: &str = "id, name, email, age, gender, height, weight, location, fitness_level, \
     fitness_goal, dietary_pref, medical_notes, created_at, updated_at";

async fn load_profile(db: &SqlitePool, user_id: &str) -> Result<UserProfile, ApiError> {
    sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// GET /api/users/me
pub async fn get_profile(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let user = load_profile(&state.db, &authed.id).await?;
    Ok(Json(ProfileResponse { user }))
}

/// PUT /api/users/me
pub async fn update_profile(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    UpdateProfileValidator.validate(&request).into_result()?;

    info!(user_id = %authed.id, "Profile update request received");

    sqlx::query(
        r#"
        UPDATE users SET
            name = COALESCE(?, name),
            age = COALESCE(?, age),
            gender = COALESCE(?, gender),
            height = COALESCE(?, height),
            weight = COALESCE(?, weight),
            location = COALESCE(?, location),
            fitness_level = COALESCE(?, fitness_level),
            fitness_goal = COALESCE(?, fitness_goal),
            dietary_pref = COALESCE(?, dietary_pref),
            medical_notes = COALESCE(?, medical_notes),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(request.name.as_deref().map(str::trim))
    .bind(request.age)
    .bind(request.gender.as_deref())
    .bind(request.height)
    .bind(request.weight)
    .bind(request.location.as_deref())
    .bind(request.fitness_level.as_deref())
    .bind(request.fitness_goal.as_deref())
    .bind(request.dietary_pref.as_deref())
    .bind(request.medical_notes.as_deref())
    .bind(&authed.id)
    .execute(&state.db)
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %authed.id, "Database error updating profile");
        ApiError::DatabaseError(e)
    })?;

    let user = load_profile(&state.db, &authed.id).await?;
    info!(user_id = %authed.id, "Profile updated successfully");

    Ok(Json(ProfileResponse { user }))
}
