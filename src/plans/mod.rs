// src/plans/mod.rs
//! Plan records: queued generation, status polling, listing and regeneration

pub mod handlers;
pub mod models;
pub mod prompt;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::plans_routes;
