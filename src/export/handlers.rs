// src/export/handlers.rs

use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{ExportPdfRequest, PdfJobData};
use crate::ai::handlers::enqueue_job;
use crate::ai::models::JobAcceptedResponse;
use crate::auth::AuthedUser;
use crate::common::{ApiError, ApiJson, AppState, ValidationResult};
use crate::plans::handlers::find_owned_plan;
use crate::queue::QueueName;

pub const GENERATE_PDF_JOB: &str = "generate-pdf";

/// POST /api/export/pdf
pub async fn export_pdf(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    ApiJson(request): ApiJson<ExportPdfRequest>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), ApiError> {
    let state = state_lock.read().await.clone();

    let Some(plan_id) = request.plan_id.filter(|p| !p.is_empty()) else {
        let mut result = ValidationResult::new();
        result.add_error("planId", "Required");
        return Err(result.into());
    };

    let plan = find_owned_plan(&state, &plan_id, &authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;
    if !plan.is_completed() {
        return Err(ApiError::BadRequest(
            "Plan is not ready for PDF generation".to_string(),
        ));
    }

    let data = PdfJobData {
        plan_id: plan.id,
        user_id: authed.id.clone(),
    };
    let response = enqueue_job(
        &state,
        QueueName::PdfGeneration,
        GENERATE_PDF_JOB,
        &data,
        "PDF generation started",
    )
    .await?;

    info!("PDF generation started for user {}, plan {}", authed.id, data.plan_id);
    Ok((StatusCode::ACCEPTED, Json(response)))
}
