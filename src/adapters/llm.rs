// src/adapters/llm.rs
//! Plan text generation

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

use super::AdapterError;
use crate::common::config::{LlmProvider, ProviderConfig};
use crate::services::OpenAIService;

const SYSTEM_PROMPT: &str = "You are an expert fitness coach and nutritionist. Create a comprehensive fitness and diet plan. Respond with ONLY valid JSON, no additional text.";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: Option<String>, base_url: &str, model: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, AdapterError> {
        let provider = "Gemini";
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AdapterError::NotConfigured { provider })?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited { provider });
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(AdapterError::RequestFailed {
                provider,
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| AdapterError::InvalidResponse {
                provider,
                message: e.to_string(),
            })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AdapterError::InvalidResponse {
                provider,
                message: "empty candidate text".to_string(),
            });
        }
        Ok(text)
    }
}

pub enum LlmAdapter {
    Gemini(GeminiClient),
    OpenAi(Arc<OpenAIService>),
    Mock,
    /// Returns the given text verbatim
    #[cfg(test)]
    Fixed(String),
    /// Always fails with the given message
    #[cfg(test)]
    Failing(String),
}

impl LlmAdapter {
    pub fn from_config(config: &ProviderConfig, http: Client, openai: Arc<OpenAIService>) -> Self {
        match config.llm {
            LlmProvider::Gemini => LlmAdapter::Gemini(GeminiClient::new(
                http,
                config.gemini_api_key.clone(),
                &config.gemini_base_url,
                &config.gemini_model,
            )),
            LlmProvider::OpenAi => LlmAdapter::OpenAi(openai),
            LlmProvider::Mock => LlmAdapter::Mock,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmAdapter::Gemini(_) => "gemini",
            LlmAdapter::OpenAi(_) => "openai",
            LlmAdapter::Mock => "mock",
            #[cfg(test)]
            LlmAdapter::Fixed(_) | LlmAdapter::Failing(_) => "test",
        }
    }

    /// Generates plan JSON text for a prompt, with code fences removed
    pub async fn generate_plan(&self, prompt: &str) -> Result<String, AdapterError> {
        let raw = match self {
            LlmAdapter::Gemini(gemini) => {
                let enhanced = format!("{}\n\n{}", SYSTEM_PROMPT, prompt);
                gemini.generate_content(&enhanced).await?
            }
            LlmAdapter::OpenAi(openai) => openai.chat_completion(SYSTEM_PROMPT, prompt).await?,
            LlmAdapter::Mock => {
                info!("Using mock LLM plan");
                mock_plan()
            }
            #[cfg(test)]
            LlmAdapter::Fixed(text) => text.clone(),
            #[cfg(test)]
            LlmAdapter::Failing(message) => {
                return Err(AdapterError::RequestFailed {
                    provider: "test",
                    message: message.clone(),
                })
            }
        };
        Ok(strip_code_fences(&raw))
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json)?\n?").unwrap_or_else(|_| unreachable!()))
}

/// Removes Markdown code fences (```json ... ```) around model output
pub fn strip_code_fences(text: &str) -> String {
    fence_regex().replace_all(text, "").trim().to_string()
}

/// The fixed one-day plan used by the mock provider and the final-attempt
/// fallback.
pub fn mock_plan() -> String {
    json!({
        "workoutPlan": [
            {
                "day": 1,
                "dayName": "Monday",
                "focus": "Upper Body",
                "exercises": [
                    {
                        "name": "Push-ups",
                        "sets": 3,
                        "reps": "10-15",
                        "rest": "60 seconds",
                        "instructions": "Keep core tight, full range of motion"
                    },
                    {
                        "name": "Dumbbell Rows",
                        "sets": 3,
                        "reps": "12",
                        "rest": "90 seconds",
                        "instructions": "Pull with your back muscles, not arms"
                    }
                ],
                "duration": "45 minutes",
                "notes": "Focus on form over speed"
            }
        ],
        "dietPlan": [
            {
                "day": 1,
                "dayName": "Monday",
                "meals": [
                    {
                        "type": "breakfast",
                        "name": "Oatmeal with Berries",
                        "ingredients": ["1 cup oats", "1/2 cup blueberries", "1 tbsp honey"],
                        "calories": 350,
                        "protein": 12,
                        "carbs": 65,
                        "fat": 6,
                        "instructions": "Cook oats, top with berries and honey"
                    }
                ],
                "totalCalories": 2200,
                "totalProtein": 120,
                "totalCarbs": 250,
                "totalFat": 80
            }
        ],
        "metadata": {
            "estimatedCaloriesPerDay": 2200,
            "macroSplit": {
                "protein": "22%",
                "carbs": "45%",
                "fat": "33%"
            },
            "estimatedWeightChangePerWeek": "-0.5kg",
            "difficultyLevel": "intermediate",
            "equipmentNeeded": ["dumbbells", "resistance bands"],
            "tips": [
                "Stay hydrated throughout the day",
                "Get 7-9 hours of sleep",
                "Listen to your body and rest when needed"
            ]
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("  {\"plain\":true} "), "{\"plain\":true}");
    }

    #[tokio::test]
    async fn test_mock_plan_has_required_sections() {
        let text = LlmAdapter::Mock.generate_plan("ignored").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("workoutPlan").is_some());
        assert!(value.get("dietPlan").is_some());
        assert_eq!(value["metadata"]["estimatedCaloriesPerDay"], 2200);
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_not_configured() {
        let adapter = LlmAdapter::Gemini(GeminiClient::new(
            Client::new(),
            None,
            "http://127.0.0.1:9",
            "gemini-2.5-flash",
        ));
        let err = adapter.generate_plan("prompt").await.unwrap_err();
        assert!(matches!(err, AdapterError::NotConfigured { provider: "Gemini" }));
    }
}
