// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::adapters::{ImageAdapter, LlmAdapter, TtsAdapter};
use crate::queue::Queues;
use crate::services::{EmailService, RateLimitService, StorageService};

/// Database pool, configuration, queues and the provider adapters. Cloned
/// into every handler and worker.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub http: Client,
    pub queues: Queues,
    pub llm: Arc<LlmAdapter>,
    pub tts: Arc<TtsAdapter>,
    pub image: Arc<ImageAdapter>,
    pub storage: Arc<StorageService>,
    pub email: Arc<EmailService>,
    pub rate_limit_service: Arc<RateLimitService>,
}
