// src/ai/handlers.rs

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde_json::{to_value, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{
    AiJobStatusResponse, ImageJobData, ImageRequest, JobAcceptedResponse, TtsJobData, TtsRequest,
};
use super::validators::{ImageValidator, TtsValidator};
use crate::adapters::ImageKind;
use crate::auth::AuthedUser;
use crate::common::helpers::parse_json_text;
use crate::common::{ApiError, ApiJson, AppState, Validator};
use crate::plans::handlers::find_owned_plan;
use crate::plans::models::Plan;
use crate::queue::{JobRecord, JobState, QueueName};
use crate::services::RateLimitPolicy;

pub const GENERATE_TTS_JOB: &str = "generate-tts";
pub const GENERATE_IMAGE_JOB: &str = "generate-image";

pub fn job_status_url(queue: QueueName, job_id: &str) -> String {
    format!("/api/ai/jobs/{}/{}", queue.as_str(), job_id)
}

/// Enqueues `data` and builds the 202 body
pub async fn enqueue_job<T: serde::Serialize>(
    state: &AppState,
    queue: QueueName,
    job_name: &str,
    data: &T,
    message: &'static str,
) -> Result<JobAcceptedResponse, ApiError> {
    let payload = to_value(data).map_err(|e| ApiError::InternalServer(e.to_string()))?;
    let job = state.queues.get(queue).add(job_name, payload).await?;
    Ok(JobAcceptedResponse {
        status_url: job_status_url(queue, &job.id),
        job_id: job.id,
        status: "processing",
        message,
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "unknown".to_string(),
        other => other.to_string(),
    }
}

/// Spoken summary of a completed plan
pub fn plan_summary(plan: &Plan) -> String {
    let workout = parse_json_text(&plan.workout_plan);
    let metadata = plan
        .metadata
        .as_deref()
        .map(parse_json_text)
        .unwrap_or(Value::Null);

    let days = workout.as_array().map(Vec::as_slice).unwrap_or(&[]);
    let total_exercises: usize = days
        .iter()
        .map(|day| day["exercises"].as_array().map_or(0, Vec::len))
        .sum();

    [
        "Your personalized fitness plan is ready!".to_string(),
        format!(
            "This {}-day program includes {} exercises designed for your {} goal.",
            days.len(),
            total_exercises,
            plan.fitness_goal
        ),
        format!(
            "Your estimated daily calorie target is {} calories.",
            scalar_text(&metadata["estimatedCaloriesPerDay"])
        ),
        format!(
            "The plan is designed for {} level.",
            scalar_text(&metadata["difficultyLevel"])
        ),
        "Remember to stay hydrated, get adequate rest, and listen to your body throughout your fitness journey.".to_string(),
        "Good luck achieving your fitness goals!".to_string(),
    ]
    .join("\n")
}

/// POST /api/ai/tts
///
/// Speaks either the given text or a summary of a completed plan. With a
/// plan id the resulting audio URL is also stored on the plan.
pub async fn generate_tts(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<TtsRequest>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let state = state_lock.read().await.clone();
    state
        .rate_limit_service
        .enforce(RateLimitPolicy::Ai, &authed.id)
        .await?;
    TtsValidator.validate(&request).into_result()?;

    let plan_id = request.plan_id.filter(|p| !p.is_empty());
    let text = match &plan_id {
        Some(plan_id) => {
            let plan = find_owned_plan(&state, plan_id, &authed.id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;
            if !plan.is_completed() {
                return Err(ApiError::BadRequest(
                    "Plan is not ready for TTS generation".to_string(),
                ));
            }
            plan_summary(&plan)
        }
        None => request.text.unwrap_or_default(),
    };

    info!("Generating TTS for user {}", authed.id);
    let data = TtsJobData {
        text,
        user_id: authed.id.clone(),
        plan_id,
    };
    let response = enqueue_job(
        &state,
        QueueName::TtsGeneration,
        GENERATE_TTS_JOB,
        &data,
        "TTS generation started",
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /api/ai/images
pub async fn generate_image(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<ImageRequest>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let state = state_lock.read().await.clone();
    state
        .rate_limit_service
        .enforce(RateLimitPolicy::Ai, &authed.id)
        .await?;
    ImageValidator.validate(&request).into_result()?;

    let kind = match request.kind.as_deref() {
        Some("exercise") => ImageKind::Exercise,
        Some("meal") => ImageKind::Meal,
        _ => return Err(ApiError::BadRequest("Invalid image type".to_string())),
    };
    let data = ImageJobData {
        prompt: request.prompt.unwrap_or_default().trim().to_string(),
        kind,
        user_id: authed.id.clone(),
    };

    info!(user_id = %authed.id, kind = %kind.as_str(), "Image generation requested");
    let response = enqueue_job(
        &state,
        QueueName::ImageGeneration,
        GENERATE_IMAGE_JOB,
        &data,
        "Image generation started",
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn owned_by(job: &JobRecord, user_id: &str) -> bool {
    job.data_str("userId") == Some(user_id)
}

/// GET /api/ai/jobs/:queue/:job_id
pub async fn job_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path((queue, job_id)): Path<(String, String)>,
) -> Result<Json<AiJobStatusResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let not_found = || ApiError::NotFound("Job not found".to_string());

    let queue: QueueName = queue.parse().map_err(|_| not_found())?;
    let job = state.queues.get(queue).get_job(&job_id).await?.ok_or_else(not_found)?;

    if !owned_by(&job, &authed.id) {
        warn!(job_id = %job_id, user_id = %authed.id, "Job status requested for another user's job");
        return Err(not_found());
    }

    Ok(Json(AiJobStatusResponse {
        job_id: job.id,
        queue: queue.as_str(),
        status: job.state.as_str(),
        progress: job.progress,
        result: job.return_value,
        failed_reason: job.failed_reason.filter(|_| job.state == JobState::Failed),
    }))
}
