//! JWT issuing/verification and password hashing

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::error;
use uuid::Uuid;

use super::models::Claims;
use crate::common::config::JwtConfig;
use crate::common::ApiError;

/// A signed token and the moment it stops being valid
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn sign(user_id: &str, secret: &str, ttl: Duration) -> Result<IssuedToken, ApiError> {
    let now = Utc::now();
    let expires_at = now + ttl;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign JWT");
        ApiError::InternalServer("token generation failed".to_string())
    })?;

    Ok(IssuedToken { token, expires_at })
}

fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

pub fn issue_access_token(jwt: &JwtConfig, user_id: &str) -> Result<IssuedToken, ApiError> {
    sign(user_id, &jwt.access_secret, Duration::minutes(jwt.access_ttl_minutes))
}

pub fn issue_refresh_token(jwt: &JwtConfig, user_id: &str) -> Result<IssuedToken, ApiError> {
    sign(user_id, &jwt.refresh_secret, Duration::days(jwt.refresh_ttl_days))
}

pub fn verify_access_token(jwt: &JwtConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    verify(token, &jwt.access_secret)
}

pub fn verify_refresh_token(jwt: &JwtConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    verify(token, &jwt.refresh_secret)
}

/// bcrypt on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::InternalServer(format!("password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::InternalServer(format!("password hashing failed: {}", e)))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::InternalServer(format!("password check task failed: {}", e)))?
        .map_err(|e| ApiError::InternalServer(format!("password check failed: {}", e)))
}

/// Expiry timestamps are stored as RFC 3339 text; anything unparseable
/// counts as expired.
pub fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(at) => at.with_timezone(&Utc) <= Utc::now(),
        Err(_) => true,
    }
}
