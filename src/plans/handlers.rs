// src/plans/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde_json::to_value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::models::{
    GeneratePlanRequest, GeneratePlanResponse, JobStatusResponse, ListQuery, Pagination, Plan,
    PlanInput, PlanJobData, PlanListResponse, PlanResponse, PlanStatusSummary, PlanSummary,
    PLAN_COLUMNS, STATUS_COMPLETED, STATUS_FAILED, STATUS_GENERATING,
};
use super::validators::GeneratePlanValidator;
use crate::auth::AuthedUser;
use crate::common::{generate_plan_id, ApiError, ApiJson, AppState, Validator};
use crate::queue::JobState;
use crate::services::RateLimitPolicy;

pub const GENERATE_PLAN_JOB: &str = "generate-plan";

/// Loads a plan only if it belongs to `user_id`
pub async fn find_owned_plan(
    state: &AppState,
    plan_id: &str,
    user_id: &str,
) -> Result<Option<Plan>, ApiError> {
    let plan = sqlx::query_as::<_, Plan>(&format!(
        "SELECT {} FROM plans WHERE id = ? AND user_id = ?",
        PLAN_COLUMNS
    ))
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(plan)
}

/// Writes a `generating` plan row, enqueues its job and links the two.
/// If the queue refuses the job the row is marked failed.
async fn start_generation(
    state: &AppState,
    user_id: &str,
    input: PlanInput,
) -> Result<GeneratePlanResponse, ApiError> {
    let plan_id = generate_plan_id();

    sqlx::query(
        r#"
        INSERT INTO plans (id, user_id, age, gender, height, weight, fitness_level, fitness_goal,
                           location, dietary_pref, medical_notes, workout_plan, diet_plan, metadata, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '{}', '{}', '{}', ?)
        "#,
    )
    .bind(&plan_id)
    .bind(user_id)
    .bind(input.age)
    .bind(&input.gender)
    .bind(input.height)
    .bind(input.weight)
    .bind(&input.fitness_level)
    .bind(&input.fitness_goal)
    .bind(input.location.as_deref())
    .bind(input.dietary_pref.as_deref())
    .bind(input.medical_notes.as_deref())
    .bind(STATUS_GENERATING)
    .execute(&state.db)
    .await?;

    let payload = PlanJobData {
        plan_id: plan_id.clone(),
        user_id: user_id.to_string(),
        input,
    };
    let payload = to_value(&payload).map_err(|e| ApiError::InternalServer(e.to_string()))?;

    let job = match state.queues.plan_generation.add(GENERATE_PLAN_JOB, payload).await {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, plan_id = %plan_id, "Failed to enqueue plan generation");
            sqlx::query(
                "UPDATE plans SET status = ?, updated_at = datetime('now') WHERE id = ? AND status = ?",
            )
            .bind(STATUS_FAILED)
            .bind(&plan_id)
            .bind(STATUS_GENERATING)
            .execute(&state.db)
            .await?;
            return Err(ApiError::ServiceUnavailable(
                "Plan generation is temporarily unavailable".to_string(),
            ));
        }
    };

    sqlx::query("UPDATE plans SET job_id = ? WHERE id = ?")
        .bind(&job.id)
        .bind(&plan_id)
        .execute(&state.db)
        .await?;

    info!(plan_id = %plan_id, job_id = %job.id, user_id = %user_id, "Plan generation queued");

    Ok(GeneratePlanResponse {
        status_url: format!("/api/plans/status/{}", job.id),
        plan_id,
        job_id: job.id,
        status: STATUS_GENERATING,
    })
}

/// POST /api/plans/generate
pub async fn generate_plan(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<GeneratePlanRequest>,
) -> Result<(StatusCode, Json<GeneratePlanResponse>), ApiError> {
    let state = state_lock.read().await.clone();
    state
        .rate_limit_service
        .enforce(RateLimitPolicy::PlanGeneration, &authed.id)
        .await?;

    GeneratePlanValidator.validate(&request).into_result()?;
    let input = PlanInput::from_request(request)
        .ok_or_else(|| ApiError::BadRequest("Missing plan attributes".to_string()))?;

    let response = start_generation(&state, &authed.id, input).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/plans/status/:jobId
///
/// Reports queue state for the caller's own job. Once the queue has pruned
/// the record the state is derived from the plan row.
pub async fn job_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let not_found = || ApiError::NotFound("Job not found".to_string());

    let job = state.queues.plan_generation.get_job(&job_id).await?;
    if let Some(job) = &job {
        if job.data_str("userId") != Some(authed.id.as_str()) {
            warn!(job_id = %job_id, user_id = %authed.id, "Job status requested for another user's job");
            return Err(not_found());
        }
    }

    // Memory-backed job ids restart with the process, so a live job is
    // matched to its plan through the payload rather than the stored job id.
    let plan = match job.as_ref().and_then(|j| j.data_str("planId")) {
        Some(plan_id) => {
            sqlx::query_as::<_, PlanStatusSummary>(
                "SELECT id, status, created_at, updated_at FROM plans WHERE id = ? AND user_id = ?",
            )
            .bind(plan_id)
            .bind(&authed.id)
            .fetch_optional(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, PlanStatusSummary>(
                r#"SELECT id, status, created_at, updated_at FROM plans
                   WHERE job_id = ? AND user_id = ?
                   ORDER BY created_at DESC, rowid DESC LIMIT 1"#,
            )
            .bind(&job_id)
            .bind(&authed.id)
            .fetch_optional(&state.db)
            .await?
        }
    };

    match (job, plan) {
        (Some(job), plan) => Ok(Json(JobStatusResponse {
            job_id: job.id,
            status: job.state.as_str(),
            progress: job.progress,
            failed_reason: job.failed_reason.filter(|_| job.state == JobState::Failed),
            plan,
        })),
        (None, Some(plan)) => {
            let (status, progress) = match plan.status.as_str() {
                STATUS_COMPLETED => (JobState::Completed, 100),
                STATUS_FAILED => (JobState::Failed, 100),
                _ => (JobState::Waiting, 0),
            };
            Ok(Json(JobStatusResponse {
                job_id,
                status: status.as_str(),
                progress,
                failed_reason: None,
                plan: Some(plan),
            }))
        }
        (None, None) => Err(not_found()),
    }
}

/// GET /api/plans
pub async fn list_plans(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PlanListResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let page = query.page();
    let limit = query.limit();

    let plans = sqlx::query_as::<_, PlanSummary>(
        r#"
        SELECT id, age, gender, height, weight, fitness_goal, fitness_level, status, created_at, updated_at
        FROM plans
        WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&authed.id)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plans WHERE user_id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(PlanListResponse {
        plans,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// GET /api/plans/:id
pub async fn get_plan(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let plan = find_owned_plan(&state, &plan_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;
    Ok(Json(PlanResponse { plan }))
}

/// POST /api/plans/:id/regenerate
///
/// Starts a fresh plan from the source plan's inputs; the source row is
/// left untouched.
pub async fn regenerate_plan(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(plan_id): Path<String>,
) -> Result<(StatusCode, Json<GeneratePlanResponse>), ApiError> {
    let state = state_lock.read().await.clone();
    state
        .rate_limit_service
        .enforce(RateLimitPolicy::PlanGeneration, &authed.id)
        .await?;

    let source = find_owned_plan(&state, &plan_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;

    let response = start_generation(&state, &authed.id, source.input()).await?;
    info!(source_plan_id = %plan_id, plan_id = %response.plan_id, "Plan regeneration queued");
    Ok((StatusCode::ACCEPTED, Json(response)))
}
