// src/adapters/mod.rs
//
// Single-provider wrappers around the AI vendors. The provider for each
// adapter is fixed at startup from configuration.

pub mod image;
pub mod llm;
pub mod tts;

pub use image::{ImageAdapter, ImageKind};
pub use llm::LlmAdapter;
pub use tts::TtsAdapter;

use crate::services::openai::OpenAIError;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{provider} API key not configured")]
    NotConfigured { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    RequestFailed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an unusable response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: &'static str },
}

impl From<OpenAIError> for AdapterError {
    fn from(e: OpenAIError) -> Self {
        let provider = "OpenAI";
        match e {
            OpenAIError::NotConfigured => AdapterError::NotConfigured { provider },
            OpenAIError::RequestFailed(message) => AdapterError::RequestFailed { provider, message },
            OpenAIError::InvalidResponse(message) => {
                AdapterError::InvalidResponse { provider, message }
            }
            OpenAIError::RateLimitExceeded => AdapterError::RateLimited { provider },
        }
    }
}
