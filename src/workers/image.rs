// src/workers/image.rs

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::info;

use super::{parse_payload, JobContext, JobHandler, WorkerError};
use crate::adapters::ImageKind;
use crate::ai::models::ImageJobData;
use crate::queue::{JobRecord, QueueName};

pub struct ImageWorker;

pub fn image_key(kind: ImageKind, user_id: &str, timestamp_ms: i64) -> String {
    format!("images/{}/{}/{}.png", kind.as_str(), user_id, timestamp_ms)
}

#[async_trait]
impl JobHandler for ImageWorker {
    fn queue(&self) -> QueueName {
        QueueName::ImageGeneration
    }

    async fn handle(&self, ctx: &JobContext<'_>, job: &mut JobRecord) -> Result<Value, WorkerError> {
        let data: ImageJobData = parse_payload(job)?;
        info!("Starting image generation for job {}", job.id);

        ctx.progress(job, 20).await;
        let image = ctx.state.image.generate_image(&data.prompt, data.kind).await?;
        ctx.progress(job, 60).await;

        let key = image_key(data.kind, &data.user_id, chrono::Utc::now().timestamp_millis());
        let image_url = ctx
            .state
            .storage
            .upload(&key, Bytes::from(image), "image/png")
            .await?;

        ctx.progress(job, 100).await;
        info!("Image generation completed for job {}", job.id);

        Ok(json!({ "imageUrl": image_url, "status": "completed" }))
    }
}
