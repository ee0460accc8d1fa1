// src/common/config.rs
//! Process configuration, read once at startup from the environment
//! (after `dotenv` has loaded any `.env` file).

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use super::run_mode::RunMode;
use crate::services::rate_limit::RateLimitConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}: expected one of {expected}")]
    InvalidChoice {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid number '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "test" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidChoice {
                name: "ENVIRONMENT",
                value: other.to_string(),
                expected: "development, production",
            }),
        }
    }
}

/// Transport behind the job queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Redis,
    Memory,
}

impl FromStr for QueueBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(QueueBackend::Redis),
            "memory" => Ok(QueueBackend::Memory),
            other => Err(ConfigError::InvalidChoice {
                name: "QUEUE_BACKEND",
                value: other.to_string(),
                expected: "redis, memory",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAi,
    Mock,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "openai" => Ok(LlmProvider::OpenAi),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(ConfigError::InvalidChoice {
                name: "LLM_PROVIDER",
                value: other.to_string(),
                expected: "gemini, openai, mock",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAi,
    Mock,
}

impl FromStr for TtsProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(TtsProvider::OpenAi),
            "mock" => Ok(TtsProvider::Mock),
            other => Err(ConfigError::InvalidChoice {
                name: "TTS_PROVIDER",
                value: other.to_string(),
                expected: "openai, mock",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    OpenAi,
    Mock,
}

impl FromStr for ImageProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ImageProvider::OpenAi),
            "mock" => Ok(ImageProvider::Mock),
            other => Err(ConfigError::InvalidChoice {
                name: "IMAGE_PROVIDER",
                value: other.to_string(),
                expected: "openai, mock",
            }),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub llm: LlmProvider,
    pub tts: TtsProvider,
    pub image: ImageProvider,
    pub llm_fallback_to_mock: bool,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("llm", &self.llm)
            .field("tts", &self.tts)
            .field("image", &self.image)
            .field("llm_fallback_to_mock", &self.llm_fallback_to_mock)
            .field("gemini_model", &self.gemini_model)
            .field("openai_model", &self.openai_model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 bucket; when absent files are written under `uploads_dir`
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub signed_urls: bool,
    pub uploads_dir: PathBuf,
    /// Base URL that local uploads are reachable under
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from_email: Option<String>,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub run_mode: RunMode,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub queue_backend: QueueBackend,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub admin_emails: HashSet<String>,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub providers: ProviderConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub rate_limits: RateLimitConfig,
    pub sentry_dsn: Option<String>,
}

const DEV_ACCESS_SECRET: &str = "dev_access_secret_change_me";
const DEV_REFRESH_SECRET: &str = "dev_refresh_secret_change_me";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let environment: Environment = get_or("ENVIRONMENT", "development").parse()?;

        let jwt = JwtConfig {
            access_secret: secret(&get, "JWT_ACCESS_SECRET", DEV_ACCESS_SECRET, environment)?,
            refresh_secret: secret(&get, "JWT_REFRESH_SECRET", DEV_REFRESH_SECRET, environment)?,
            access_ttl_minutes: number(&get, "JWT_ACCESS_TTL_MINUTES", 15)?,
            refresh_ttl_days: number(&get, "JWT_REFRESH_TTL_DAYS", 7)?,
        };

        let admin_emails: HashSet<String> = get_or("ADMIN_EMAILS", "")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let port: u16 = number(&get, "PORT", 3001)?;
        let frontend_url = get_or("FRONTEND_URL", "http://localhost:3000");
        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![frontend_url.clone()],
        };

        let providers = ProviderConfig {
            llm: get_or("LLM_PROVIDER", "gemini").parse()?,
            tts: get_or("TTS_PROVIDER", "openai").parse()?,
            image: get_or("IMAGE_PROVIDER", "openai").parse()?,
            llm_fallback_to_mock: flag(&get, "LLM_FALLBACK_TO_MOCK", false),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_base_url: get_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: get_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        };

        let storage = StorageConfig {
            bucket: get("S3_BUCKET_NAME"),
            region: get_or("AWS_REGION", "us-east-1"),
            endpoint: get("S3_ENDPOINT").map(|e| e.trim_end_matches('/').to_string()),
            signed_urls: flag(&get, "S3_SIGNED_URLS", false),
            uploads_dir: PathBuf::from(get_or("UPLOADS_DIR", "./uploads")),
            public_base_url: get_or("PUBLIC_BASE_URL", &format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
        };

        let email = EmailConfig {
            from_email: get("SES_FROM_EMAIL"),
            region: get("SES_REGION").unwrap_or_else(|| storage.region.clone()),
        };

        let rate_limits = RateLimitConfig {
            enabled: flag(&get, "RATE_LIMIT_ENABLED", true),
            window_ms: number(&get, "RATE_LIMIT_WINDOW_MS", 15 * 60 * 1000)?,
            max_requests: number(&get, "RATE_LIMIT_MAX_REQUESTS", 100)?,
            plan_generation_per_hour: number(&get, "PLAN_GENERATION_LIMIT_PER_HOUR", 5)?,
            ai_max_requests: number(&get, "RATE_LIMIT_AI_MAX_REQUESTS", 20)?,
            ai_window_ms: number(&get, "RATE_LIMIT_AI_WINDOW_MS", 15 * 60 * 1000)?,
        };

        Ok(Self {
            environment,
            run_mode: get_or("RUN_MODE", "all").parse()?,
            port,
            database_url: get_or("DATABASE_URL", "sqlite://fitcoach.db"),
            redis_url: get_or("REDIS_URL", "redis://127.0.0.1:6379"),
            queue_backend: get_or("QUEUE_BACKEND", "redis").parse()?,
            jwt,
            bcrypt_cost: number(&get, "BCRYPT_COST", 12)?,
            admin_emails,
            frontend_url,
            cors_origins,
            providers,
            storage,
            email,
            rate_limits,
            sentry_dsn: get("SENTRY_DSN"),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }
}

fn secret<G>(
    get: &G,
    name: &'static str,
    dev_default: &str,
    environment: Environment,
) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => Ok(value),
        None if environment.is_production() => Err(ConfigError::Missing(name)),
        None => Ok(dev_default.to_string()),
    }
}

fn number<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

fn flag<G>(get: &G, name: &str, default: bool) -> bool
where
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
