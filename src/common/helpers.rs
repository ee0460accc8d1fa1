// Helper functions for safe logging and serialization

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first: String = parts[0].chars().take(1).collect();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Serializes a JSON column stored as TEXT back into a JSON value for API
/// responses. Unparseable text is rendered as an empty object.
pub fn serialize_json_text<S>(text: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    parse_json_text(text).serialize(serializer)
}

pub fn serialize_optional_json_text<S>(
    text: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match text {
        Some(text) => parse_json_text(text).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

pub fn parse_json_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Prints whole numbers without a trailing `.0` (175.0 reads as "175")
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("abc"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign"), "***@***.***");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(safe_token_log("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_parse_json_text_falls_back_to_empty_object() {
        assert_eq!(parse_json_text("{\"a\":1}")["a"], 1);
        assert!(parse_json_text("not json").as_object().unwrap().is_empty());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(175.0), "175");
        assert_eq!(format_number(65.5), "65.5");
    }
}
