//! # Auth Module
//!
//! Email/password accounts:
//! - Registration and login with bcrypt password hashes
//! - HS256 access and refresh tokens, with refresh rotation
//! - Password reset via single-use emailed tokens
//! - `AuthedUser` / `AdminUser` extractors for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod tokens;
pub mod validators;


pub use extractors::{AdminUser, AuthedUser};
pub use routes::auth_routes;
