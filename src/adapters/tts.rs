// src/adapters/tts.rs
//! Text-to-speech

use bytes::Bytes;
use std::sync::Arc;

use super::AdapterError;
use crate::common::config::{ProviderConfig, TtsProvider};
use crate::services::OpenAIService;

const MOCK_AUDIO: &[u8] = b"mock-audio-data";

pub enum TtsAdapter {
    OpenAi(Arc<OpenAIService>),
    Mock,
}

impl TtsAdapter {
    pub fn from_config(config: &ProviderConfig, openai: Arc<OpenAIService>) -> Self {
        match config.tts {
            TtsProvider::OpenAi => TtsAdapter::OpenAi(openai),
            TtsProvider::Mock => TtsAdapter::Mock,
        }
    }

    /// MP3 audio for the given text
    pub async fn generate_speech(&self, text: &str) -> Result<Bytes, AdapterError> {
        match self {
            TtsAdapter::OpenAi(openai) => Ok(openai.speech(text).await?),
            TtsAdapter::Mock => Ok(Bytes::from_static(MOCK_AUDIO)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_speech_is_fixed() {
        let audio = TtsAdapter::Mock.generate_speech("anything").await.unwrap();
        assert_eq!(&audio[..], b"mock-audio-data");
    }
}
