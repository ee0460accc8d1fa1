// Error handling types for the API

use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

use super::validation::ValidationResult;

/// Whether 500 responses carry the underlying message. Off unless the
/// process starts in development mode.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    RateLimited { message: String, retry_after: u32 },
    InternalServer(String),
    ServiceUnavailable(String),
    DatabaseError(sqlx::Error),
    ValidationError(Vec<FieldError>),
}

/// One failed validation rule, reported back to the client
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::RateLimited { message, .. } => write!(f, "Rate Limited: {}", message),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation Error: {} field(s) invalid", errors.len())
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn internal_message(msg: String) -> String {
    if expose_internal_errors() {
        msg
    } else {
        "Internal server error".to_string()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut retry_after_header = None;
        let mut details = None;

        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            ApiError::RateLimited {
                message,
                retry_after,
            } => {
                retry_after_header = Some(retry_after);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    message,
                    "RATE_LIMIT_EXCEEDED",
                )
            }
            ApiError::InternalServer(msg) => {
                error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    internal_message(msg),
                    "INTERNAL_SERVER_ERROR",
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::DatabaseError(e) => match &e {
                sqlx::Error::RowNotFound => (
                    StatusCode::NOT_FOUND,
                    "Resource not found".to_string(),
                    "NOT_FOUND",
                ),
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    warn!(error = %e, "Unique constraint violated");
                    (
                        StatusCode::CONFLICT,
                        "Resource already exists".to_string(),
                        "CONFLICT",
                    )
                }
                _ => {
                    error!(error = %e, "Database error occurred");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        internal_message(format!("Database operation failed: {}", e)),
                        "DATABASE_ERROR",
                    )
                }
            },
            ApiError::ValidationError(errors) => {
                details = serde_json::to_value(&errors).ok();
                (
                    StatusCode::BAD_REQUEST,
                    "Validation failed".to_string(),
                    "VALIDATION_ERROR",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            details,
        };

        let mut response = (status, Json(error_response)).into_response();
        if let Some(retry_after) = retry_after_header {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
        }
        response
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            ApiError::ValidationError(
                result
                    .errors
                    .into_iter()
                    .map(|e| FieldError {
                        field: e.field,
                        message: e.message,
                    })
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_row_not_found_maps_to_404() {
        let (status, body) = body_json(ApiError::DatabaseError(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_internal_message_is_suppressed_by_default() {
        let (status, body) =
            body_json(ApiError::InternalServer("secret detail".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_error_carries_details() {
        let mut result = ValidationResult::new();
        result.add_error("email", "Invalid email address");
        let (status, body) = body_json(ApiError::from(result)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            message: "slow down".to_string(),
            retry_after: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-after").unwrap(), "42");
    }
}
