// src/ai/mod.rs
//! Speech and image generation requests, queued for the workers

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;


pub use routes::ai_routes;
