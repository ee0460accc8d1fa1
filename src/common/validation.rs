// Common validation types and traits

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
            self.errors.extend(other.errors);
        }
    }

    /// Turns the collected errors into an `Err` so handlers can use `?`
    pub fn into_result(self) -> Result<(), super::ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }

    /// Character-count bounds on a string field
    pub fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.add_error(field, &format!("Must be at least {} characters", min));
        } else if len > max {
            self.add_error(field, &format!("Must be at most {} characters", max));
        }
    }

    /// Inclusive numeric bounds
    pub fn check_range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.add_error(field, &format!("Must be between {} and {}", min, max));
        }
    }

    pub fn check_one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.add_error(field, &format!("Must be one of: {}", allowed.join(", ")));
        }
    }

    pub fn check_email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.add_error(field, "Invalid email address");
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|_| unreachable!())
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("t@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@b"));
    }

    #[test]
    fn test_length_counts_characters() {
        let mut result = ValidationResult::new();
        result.check_length("name", "Zoë", 2, 3);
        assert!(result.is_valid);

        result.check_length("name", "Z", 2, 3);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "name");
    }

    #[test]
    fn test_range_rejects_nan() {
        let mut result = ValidationResult::new();
        result.check_range("height", f64::NAN, 100.0, 250.0);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_merge_keeps_all_errors() {
        let mut first = ValidationResult::new();
        first.add_error("a", "bad");
        let mut second = ValidationResult::new();
        second.add_error("b", "bad");

        first.merge(second);
        assert_eq!(first.errors.len(), 2);
        assert!(first.into_result().is_err());
    }
}
