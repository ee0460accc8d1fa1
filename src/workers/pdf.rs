// src/workers/pdf.rs

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_payload, JobContext, JobHandler, WorkerError};
use crate::common::helpers::parse_json_text;
use crate::export::models::PdfJobData;
use crate::plans::models::{Plan, PLAN_COLUMNS};
use crate::queue::{JobRecord, QueueName};
use crate::services::pdf::{generate_plan_pdf, PlanDocument};

pub struct PdfWorker;

pub fn pdf_key(user_id: &str, plan_id: &str) -> String {
    format!("pdfs/{}/{}.pdf", user_id, plan_id)
}

fn plan_document(plan: &Plan) -> PlanDocument {
    PlanDocument {
        age: plan.age,
        gender: plan.gender.clone(),
        height: plan.height,
        weight: plan.weight,
        fitness_goal: plan.fitness_goal.clone(),
        fitness_level: plan.fitness_level.clone(),
        workout_plan: parse_json_text(&plan.workout_plan),
        diet_plan: parse_json_text(&plan.diet_plan),
        metadata: plan
            .metadata
            .as_deref()
            .map(parse_json_text)
            .unwrap_or_else(|| json!({})),
    }
}

#[async_trait]
impl JobHandler for PdfWorker {
    fn queue(&self) -> QueueName {
        QueueName::PdfGeneration
    }

    async fn handle(&self, ctx: &JobContext<'_>, job: &mut JobRecord) -> Result<Value, WorkerError> {
        let data: PdfJobData = parse_payload(job)?;
        info!("Starting PDF generation for job {}", job.id);

        ctx.progress(job, 20).await;
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {} FROM plans WHERE id = ? AND user_id = ?",
            PLAN_COLUMNS
        ))
        .bind(&data.plan_id)
        .bind(&data.user_id)
        .fetch_optional(&ctx.state.db)
        .await?
        .ok_or_else(|| WorkerError::Failed("Plan not found".to_string()))?;
        ctx.progress(job, 40).await;

        let generated_on = chrono::Local::now().format("%m/%d/%Y").to_string();
        let document = plan_document(&plan);
        let bytes = tokio::task::spawn_blocking(move || generate_plan_pdf(&document, &generated_on))
            .await
            .map_err(|e| WorkerError::Failed(format!("PDF task panicked: {}", e)))??;
        ctx.progress(job, 80).await;

        let key = pdf_key(&data.user_id, &data.plan_id);
        let pdf_url = ctx
            .state
            .storage
            .upload(&key, Bytes::from(bytes), "application/pdf")
            .await?;

        sqlx::query("UPDATE plans SET pdf_url = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(&pdf_url)
            .bind(&data.plan_id)
            .execute(&ctx.state.db)
            .await?;

        ctx.progress(job, 100).await;
        info!("PDF generation completed for job {}", job.id);

        Ok(json!({ "pdfUrl": pdf_url, "status": "completed" }))
    }
}
