// src/services/openai.rs
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

const TTS_MODEL: &str = "tts-1";
const TTS_VOICE: &str = "alloy";
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// Thin client over the OpenAI REST API (chat, speech, images)
#[derive(Debug, Clone)]
pub struct OpenAIService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    chat_model: String,
}

impl OpenAIService {
    pub fn new(client: Client, api_key: Option<String>, base_url: &str, chat_model: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, OpenAIError> {
        self.api_key.as_deref().ok_or(OpenAIError::NotConfigured)
    }

    /// Chat completion with a system and a user message; returns the first choice
    pub async fn chat_completion(&self, system: &str, prompt: &str) -> Result<String, OpenAIError> {
        let request = ChatCompletionRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
        };

        debug!(model = %self.chat_model, "Sending OpenAI chat completion request");
        let response = self.post("chat/completions", &request).await?;
        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| OpenAIError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            info!(
                model = %self.chat_model,
                tokens_used = usage.total_tokens,
                "OpenAI chat completion finished"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OpenAIError::InvalidResponse("No choices in response".to_string()))
    }

    /// Synthesizes speech as MP3 bytes
    pub async fn speech(&self, text: &str) -> Result<Bytes, OpenAIError> {
        let request = SpeechRequest {
            model: TTS_MODEL,
            voice: TTS_VOICE,
            input: text,
            response_format: "mp3",
        };

        debug!(chars = text.chars().count(), "Sending OpenAI speech request");
        let response = self.post("audio/speech", &request).await?;
        response
            .bytes()
            .await
            .map_err(|e| OpenAIError::InvalidResponse(e.to_string()))
    }

    /// Generates one square image and returns the decoded PNG bytes
    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, OpenAIError> {
        let request = ImageGenerationRequest {
            model: IMAGE_MODEL,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: "standard",
            response_format: "b64_json",
        };

        debug!(model = IMAGE_MODEL, "Sending OpenAI image generation request");
        let response = self.post("images/generations", &request).await?;
        let parsed = response
            .json::<ImageGenerationResponse>()
            .await
            .map_err(|e| OpenAIError::InvalidResponse(e.to_string()))?;

        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .ok_or_else(|| OpenAIError::InvalidResponse("No image data in response".to_string()))?;

        BASE64
            .decode(b64.as_bytes())
            .map_err(|e| OpenAIError::InvalidResponse(format!("Invalid base64 image: {}", e)))
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response, OpenAIError> {
        let api_key = self.api_key()?;
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| OpenAIError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OpenAIError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, path = %path, "OpenAI API request failed");
            return Err(OpenAIError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let service = OpenAIService::new(Client::new(), None, "http://127.0.0.1:9", "gpt-4o-mini");
        assert!(!service.is_configured());
        let err = service.speech("hello").await.unwrap_err();
        assert!(matches!(err, OpenAIError::NotConfigured));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let service = OpenAIService::new(
            Client::new(),
            Some("k".to_string()),
            "https://api.openai.com/v1/",
            "gpt-4o-mini",
        );
        assert_eq!(service.base_url, "https://api.openai.com/v1");
    }
}
