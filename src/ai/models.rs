// src/ai/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::ImageKind;

pub const IMAGE_KINDS: &[&str] = &["exercise", "meal"];

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub plan_id: Option<String>,
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ImageRequest {
    pub prompt: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Payload of a `generate-tts` job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TtsJobData {
    pub text: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

/// Payload of a `generate-image` job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageJobData {
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: ImageKind,
    pub user_id: String,
}

/// 202 body for any job accepted onto a queue
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JobAcceptedResponse {
    pub job_id: String,
    pub status: &'static str,
    pub message: &'static str,
    pub status_url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AiJobStatusResponse {
    pub job_id: String,
    pub queue: &'static str,
    pub status: &'static str,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
}
