// Shared fixtures for handler and worker tests

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use reqwest::Client;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use super::config::AppConfig;
use super::migrations::run_migrations;
use super::AppState;
use crate::adapters::{ImageAdapter, LlmAdapter, TtsAdapter};
use crate::auth::tokens::issue_access_token;
use crate::queue::{MemoryJobStore, Queues};
use crate::services::{EmailService, RateLimitService, StorageService};

pub const ADMIN_EMAIL: &str = "admin@example.com";

fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let uploads = std::env::temp_dir().join(format!("fitcoach-test-{}", uuid::Uuid::new_v4()));
    let mut vars: HashMap<String, String> = [
        ("QUEUE_BACKEND", "memory"),
        ("LLM_PROVIDER", "mock"),
        ("TTS_PROVIDER", "mock"),
        ("IMAGE_PROVIDER", "mock"),
        ("BCRYPT_COST", "4"),
        ("ADMIN_EMAILS", ADMIN_EMAIL),
        ("FRONTEND_URL", "http://localhost:3000"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert("UPLOADS_DIR".to_string(), uploads.display().to_string());
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// State over an in-memory database, the memory job store and mock providers
pub async fn test_state() -> AppState {
    test_state_with(LlmAdapter::Mock, &[]).await
}

pub async fn test_state_with(llm: LlmAdapter, overrides: &[(&str, &str)]) -> AppState {
    let config = test_config(overrides);

    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&db).await.unwrap();

    let storage = StorageService::local(
        config.storage.uploads_dir.clone(),
        &config.storage.public_base_url,
    );

    AppState {
        db,
        http: Client::new(),
        queues: Queues::new(Arc::new(MemoryJobStore::new())),
        llm: Arc::new(llm),
        tts: Arc::new(TtsAdapter::Mock),
        image: Arc::new(ImageAdapter::Mock),
        storage: Arc::new(storage),
        email: Arc::new(EmailService::disabled()),
        rate_limit_service: Arc::new(RateLimitService::new(config.rate_limits.clone())),
        config: Arc::new(config),
    }
}

pub fn router(state: &AppState) -> Router {
    crate::build_router(state)
}

/// Inserts a user directly and returns its id and an access token
pub async fn create_user(state: &AppState, email: &str) -> (String, String) {
    let id = super::generate_user_id();
    sqlx::query("INSERT INTO users (id, email, password_hash, name) VALUES (?, ?, 'x', 'Test User')")
        .bind(&id)
        .bind(email)
        .execute(&state.db)
        .await
        .unwrap();
    let token = issue_access_token(&state.config.jwt, &id).unwrap().token;
    (id, token)
}

/// Inserts a plan row for `user_id` with the given status
pub async fn create_plan(state: &AppState, user_id: &str, status: &str) -> String {
    let id = super::generate_plan_id();
    sqlx::query(
        r#"INSERT INTO plans (id, user_id, age, gender, height, weight, fitness_level, fitness_goal, status,
               workout_plan, diet_plan, metadata)
           VALUES (?, ?, 30, 'female', 170, 65, 'beginner', 'weight_loss', ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(status)
    .bind(r#"[{"day":1,"dayName":"Monday","focus":"Upper Body","exercises":[{"name":"Push-ups","sets":3,"reps":"10","rest":"60 seconds"}]}]"#)
    .bind(r#"[{"day":1,"dayName":"Monday","meals":[{"type":"breakfast","name":"Oats","calories":350,"protein":12,"carbs":65,"fat":6}]}]"#)
    .bind(r#"{"estimatedCaloriesPerDay":2200,"difficultyLevel":"beginner","equipmentNeeded":["dumbbells"]}"#)
    .execute(&state.db)
    .await
    .unwrap();
    id
}

/// Sends a request through the router and decodes the JSON body
pub async fn send(
    router: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
