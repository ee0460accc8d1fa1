// Common module - shared types and utilities across all modules

pub mod config;
pub mod error;
pub mod extract;
pub mod helpers;
pub mod id_generator;
pub mod migrations;
pub mod run_mode;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use extract::ApiJson;
pub use helpers::safe_email_log;
pub use id_generator::*;
pub use state::AppState;
pub use validation::{ValidationError, ValidationResult, Validator};
