// src/ai/validators.rs

use super::models::{ImageRequest, TtsRequest, IMAGE_KINDS};
use crate::common::{ValidationResult, Validator};

pub struct TtsValidator;

impl Validator<TtsRequest> for TtsValidator {
    fn validate(&self, data: &TtsRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        let has_text = data.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_plan = data.plan_id.as_deref().is_some_and(|p| !p.is_empty());
        if !has_text && !has_plan {
            result.add_error("text", "Either text or planId is required");
        }
        if let Some(text) = &data.text {
            result.check_length("text", text, 0, 5000);
        }

        result
    }
}

pub struct ImageValidator;

impl Validator<ImageRequest> for ImageValidator {
    fn validate(&self, data: &ImageRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match &data.prompt {
            Some(prompt) => result.check_length("prompt", prompt.trim(), 1, 200),
            None => result.add_error("prompt", "Required"),
        }
        match &data.kind {
            Some(kind) => result.check_one_of("type", kind, IMAGE_KINDS),
            None => result.add_error("type", "Required"),
        }

        result
    }
}
