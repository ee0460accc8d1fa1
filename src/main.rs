// src/main.rs
use axum::{extract::Extension, http::HeaderValue, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod adapters;
mod admin;
mod ai;
mod auth;
mod common;
mod export;
mod health;
mod logging_middleware;
mod plans;
mod queue;
mod rate_limit_middleware;
mod services;
mod users;
mod workers;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use adapters::{ImageAdapter, LlmAdapter, TtsAdapter};
use common::config::AppConfig;
use common::error::set_expose_internal_errors;
use common::run_mode::apply_cli_override;
use common::AppState;
use queue::Queues;
use rate_limit_middleware::rate_limit_middleware;
use services::{EmailService, OpenAIService, RateLimitService, StorageService};
use workers::WorkerPool;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

pub fn build_router(state: &AppState) -> Router {
    let rate_limit_service = state.rate_limit_service.clone();
    let shared = Arc::new(RwLock::new(state.clone()));

    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let mut app = Router::new()
        .merge(health::health_routes())
        .merge(auth::auth_routes())
        .merge(users::users_routes())
        .merge(plans::plans_routes())
        .merge(ai::ai_routes())
        .merge(export::export_routes())
        .merge(admin::admin_routes());

    if state.storage.backend_name() == "local" {
        app = app.nest_service("/uploads", ServeDir::new(&state.config.storage.uploads_dir));
    }

    app
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(rate_limit_service))
        .layer(Extension(shared))
        .layer(middleware::from_fn(logging_middleware::request_id))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    logging_middleware::REQUEST_ID_HEADER.clone(),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let mut config = AppConfig::from_env()?;
    config.run_mode = apply_cli_override(config.run_mode)?;

    let _sentry_guard =
        services::monitoring::init_sentry(config.sentry_dsn.as_deref(), config.environment);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();

    info!(
        environment = config.environment.as_str(),
        run_mode = config.run_mode.as_str(),
        "Starting fitcoach-api"
    );
    info!("Loaded admin emails: {:?}", config.admin_emails);

    set_expose_internal_errors(!config.environment.is_production());

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let openai_service = Arc::new(OpenAIService::new(
        http_client.clone(),
        config.providers.openai_api_key.clone(),
        &config.providers.openai_base_url,
        &config.providers.openai_model,
    ));
    info!("OpenAIService initialized");

    let llm = LlmAdapter::from_config(&config.providers, http_client.clone(), openai_service.clone());
    let tts = TtsAdapter::from_config(&config.providers, openai_service.clone());
    let image = ImageAdapter::from_config(&config.providers, openai_service.clone());
    info!(
        llm = ?config.providers.llm,
        tts = ?config.providers.tts,
        image = ?config.providers.image,
        "Provider adapters initialized"
    );

    let queues = Queues::from_config(&config).await?;

    if config.storage.bucket.is_none() {
        tokio::fs::create_dir_all(&config.storage.uploads_dir).await?;
    }
    let storage = Arc::new(StorageService::from_config(&config.storage).await);
    info!(backend = storage.backend_name(), "StorageService initialized");

    let email = Arc::new(EmailService::from_config(&config.email).await);

    let rate_limit_service = Arc::new(RateLimitService::new(config.rate_limits.clone()));
    info!("RateLimitService initialized");

    {
        let rate_limit_service = rate_limit_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                rate_limit_service.cleanup_expired().await;
            }
        });
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let run_mode = config.run_mode;
    let port = config.port;

    let app_state = AppState {
        db: pool,
        config: Arc::new(config),
        http: http_client,
        queues,
        llm: Arc::new(llm),
        tts: Arc::new(tts),
        image: Arc::new(image),
        storage,
        email,
        rate_limit_service,
    };

    // ========================================================================
    // WORKERS
    // ========================================================================

    let worker_pool = if run_mode.runs_workers() {
        Some(WorkerPool::start_all(app_state.clone()))
    } else {
        None
    };

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    if run_mode.runs_api() {
        let app = build_router(&app_state);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        info!("Listening on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    } else {
        info!("API disabled for this process, running workers only");
        shutdown_signal().await;
    }

    if let Some(pool) = worker_pool {
        pool.shutdown().await;
    }

    Ok(())
}
