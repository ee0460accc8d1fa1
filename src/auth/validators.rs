//! Request validation for the auth endpoints

use super::models::{LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::common::{ValidationResult, Validator};

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_length("name", data.name.trim(), 1, 100);
        result.check_email("email", data.email.trim());
        result.check_length("password", &data.password, 8, 100);
        result
    }
}

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check_email("email", data.email.trim());
        if data.password.is_empty() {
            result.add_error("password", "Required");
        }
        result
    }
}

pub struct ResetPasswordValidator;

impl Validator<ResetPasswordRequest> for ResetPasswordValidator {
    fn validate(&self, data: &ResetPasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        if data.token.trim().is_empty() {
            result.add_error("token", "Required");
        }
        result.check_length("password", &data.password, 8, 100);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rules() {
        let ok = RegisterRequest {
            name: "T".to_string(),
            email: "t@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(RegisterValidator.validate(&ok).is_valid);

        let bad = RegisterRequest {
            name: " ".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        let result = RegisterValidator.validate(&bad);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);
    }

    #[test]
    fn test_login_requires_password() {
        let result = LoginValidator.validate(&LoginRequest {
            email: "t@example.com".to_string(),
            password: String::new(),
        });
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "password");
    }

    #[test]
    fn test_reset_requires_token() {
        let result = ResetPasswordValidator.validate(&ResetPasswordRequest {
            token: " ".to_string(),
            password: "password123".to_string(),
        });
        assert!(!result.is_valid);
    }
}
