// src/workers/plan_generation.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{parse_payload, JobContext, JobHandler, WorkerError};
use crate::adapters::llm::mock_plan;
use crate::plans::models::{PlanJobData, STATUS_COMPLETED, STATUS_FAILED, STATUS_GENERATING};
use crate::plans::prompt::{build_prompt, parse_plan_response, GeneratedPlan};
use crate::queue::{JobRecord, QueueName};

pub struct PlanGenerationWorker;

/// Generates the plan text and parses it. Any failure here is a failed
/// attempt.
async fn generate(ctx: &JobContext<'_>, prompt: &str) -> Result<GeneratedPlan, WorkerError> {
    let text = ctx.state.llm.generate_plan(prompt).await?;
    parse_plan_response(&text).map_err(|e| WorkerError::Failed(e.to_string()))
}

/// The mock plan, tagged so it can be told apart from generated content
fn fallback_plan() -> Result<GeneratedPlan, WorkerError> {
    let mut plan = parse_plan_response(&mock_plan()).map_err(|e| WorkerError::Failed(e.to_string()))?;
    if let Value::Object(metadata) = &mut plan.metadata {
        metadata.insert("source".to_string(), json!("mock"));
    }
    Ok(plan)
}

#[async_trait]
impl JobHandler for PlanGenerationWorker {
    fn queue(&self) -> QueueName {
        QueueName::PlanGeneration
    }

    async fn handle(&self, ctx: &JobContext<'_>, job: &mut JobRecord) -> Result<Value, WorkerError> {
        let data: PlanJobData = parse_payload(job)?;
        info!(
            job_id = %job.id,
            plan_id = %data.plan_id,
            provider = ctx.state.llm.provider_name(),
            "Starting plan generation"
        );

        ctx.progress(job, 10).await;
        let prompt = build_prompt(&data.input);
        ctx.progress(job, 30).await;

        let plan = match generate(ctx, &prompt).await {
            Ok(plan) => plan,
            Err(e) if job.is_final_attempt() && ctx.state.config.providers.llm_fallback_to_mock => {
                warn!(
                    job_id = %job.id,
                    plan_id = %data.plan_id,
                    error = %e,
                    "LLM failed on final attempt, substituting mock plan"
                );
                fallback_plan()?
            }
            Err(e) => return Err(e),
        };
        ctx.progress(job, 70).await;

        let result = sqlx::query(
            r#"
            UPDATE plans
            SET workout_plan = ?, diet_plan = ?, metadata = ?, status = ?, updated_at = datetime('now')
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(plan.workout_plan.to_string())
        .bind(plan.diet_plan.to_string())
        .bind(plan.metadata.to_string())
        .bind(STATUS_COMPLETED)
        .bind(&data.plan_id)
        .bind(STATUS_GENERATING)
        .execute(&ctx.state.db)
        .await?;

        if result.rows_affected() == 0 {
            warn!(plan_id = %data.plan_id, "Plan already finalized, generated content discarded");
        }

        ctx.progress(job, 100).await;
        info!(job_id = %job.id, plan_id = %data.plan_id, "Plan generation completed");

        Ok(json!({ "planId": data.plan_id, "status": STATUS_COMPLETED }))
    }

    async fn on_exhausted(&self, ctx: &JobContext<'_>, job: &JobRecord, reason: &str) {
        let Some(plan_id) = job.data_str("planId") else {
            return;
        };
        let result = sqlx::query(
            "UPDATE plans SET status = ?, updated_at = datetime('now') WHERE id = ? AND status = ?",
        )
        .bind(STATUS_FAILED)
        .bind(plan_id)
        .bind(STATUS_GENERATING)
        .execute(&ctx.state.db)
        .await;

        match result {
            Ok(_) => warn!(plan_id = %plan_id, reason = %reason, "Plan marked failed"),
            Err(e) => error!(error = %e, plan_id = %plan_id, "Failed to mark plan failed"),
        }
    }
}
