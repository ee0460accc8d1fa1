// src/adapters/image.rs
//! Exercise and meal illustration

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AdapterError;
use crate::common::config::{ImageProvider, ProviderConfig};
use crate::services::OpenAIService;

/// 1x1 transparent PNG
const MOCK_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Exercise,
    Meal,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Exercise => "exercise",
            ImageKind::Meal => "meal",
        }
    }
}

/// Prefixes a style description per kind and appends a quality suffix
pub fn enhance_prompt(prompt: &str, kind: ImageKind) -> String {
    let base = match kind {
        ImageKind::Exercise => {
            "Professional fitness photography, clean gym environment, proper form demonstration, "
        }
        ImageKind::Meal => {
            "Professional food photography, appetizing presentation, healthy meal, clean background, "
        }
    };
    format!("{}{}, high quality, detailed, realistic", base, prompt)
}

pub enum ImageAdapter {
    OpenAi(Arc<OpenAIService>),
    Mock,
}

impl ImageAdapter {
    pub fn from_config(config: &ProviderConfig, openai: Arc<OpenAIService>) -> Self {
        match config.image {
            ImageProvider::OpenAi => ImageAdapter::OpenAi(openai),
            ImageProvider::Mock => ImageAdapter::Mock,
        }
    }

    /// PNG bytes for the enhanced prompt
    pub async fn generate_image(&self, prompt: &str, kind: ImageKind) -> Result<Vec<u8>, AdapterError> {
        let enhanced = enhance_prompt(prompt, kind);
        match self {
            ImageAdapter::OpenAi(openai) => Ok(openai.generate_image(&enhanced).await?),
            ImageAdapter::Mock => mock_image(),
        }
    }
}

fn mock_image() -> Result<Vec<u8>, AdapterError> {
    BASE64
        .decode(MOCK_PNG_B64)
        .map_err(|e| AdapterError::InvalidResponse {
            provider: "mock",
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_prompt() {
        let prompt = enhance_prompt("squat", ImageKind::Exercise);
        assert!(prompt.starts_with("Professional fitness photography"));
        assert!(prompt.ends_with("squat, high quality, detailed, realistic"));

        let meal = enhance_prompt("salad", ImageKind::Meal);
        assert!(meal.starts_with("Professional food photography"));
    }

    #[tokio::test]
    async fn test_mock_image_is_png() {
        let bytes = ImageAdapter::Mock
            .generate_image("salad", ImageKind::Meal)
            .await
            .unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
