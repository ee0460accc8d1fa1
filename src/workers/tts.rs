// src/workers/tts.rs

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{parse_payload, JobContext, JobHandler, WorkerError};
use crate::ai::models::TtsJobData;
use crate::queue::{JobRecord, QueueName};

pub struct TtsWorker;

pub fn audio_key(user_id: &str, timestamp_ms: i64) -> String {
    format!("tts/{}/{}.mp3", user_id, timestamp_ms)
}

#[async_trait]
impl JobHandler for TtsWorker {
    fn queue(&self) -> QueueName {
        QueueName::TtsGeneration
    }

    async fn handle(&self, ctx: &JobContext<'_>, job: &mut JobRecord) -> Result<Value, WorkerError> {
        let data: TtsJobData = parse_payload(job)?;
        info!("Starting TTS generation for job {}", job.id);

        ctx.progress(job, 20).await;
        let audio = ctx.state.tts.generate_speech(&data.text).await?;
        ctx.progress(job, 60).await;

        let key = audio_key(&data.user_id, chrono::Utc::now().timestamp_millis());
        let audio_url = ctx.state.storage.upload(&key, audio, "audio/mpeg").await?;
        ctx.progress(job, 80).await;

        if let Some(plan_id) = &data.plan_id {
            let result = sqlx::query(
                "UPDATE plans SET audio_url = ?, updated_at = datetime('now') WHERE id = ? AND user_id = ?",
            )
            .bind(&audio_url)
            .bind(plan_id)
            .bind(&data.user_id)
            .execute(&ctx.state.db)
            .await?;
            if result.rows_affected() == 0 {
                warn!(plan_id = %plan_id, "Plan for generated audio no longer exists");
            }
        }

        ctx.progress(job, 100).await;
        info!("TTS generation completed for job {}", job.id);

        Ok(json!({ "audioUrl": audio_url, "status": "completed" }))
    }
}
