// src/services/mod.rs
//
// Shared services used by the HTTP handlers and the queue workers

pub mod email;
pub mod monitoring;
pub mod openai;
pub mod pdf;
pub mod rate_limit;
pub mod storage;

// Re-export commonly used types for convenience
pub use email::EmailService;
pub use openai::OpenAIService;
pub use rate_limit::{RateLimitPolicy, RateLimitService};
pub use storage::StorageService;
