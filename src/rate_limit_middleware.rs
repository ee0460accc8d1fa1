// rate_limit_middleware.rs
use crate::common::ApiError;
use crate::services::rate_limit::{RateLimitPolicy, RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// Extract IP address from request
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    connect_info.map(|info| info.0.ip().to_string())
}

/// Global per-IP limit applied to every route
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip_address = extract_ip_address(request.headers(), connect_info.as_ref());
    let identifier = ip_address.as_deref().unwrap_or("unknown");

    match rate_limit_service
        .check(RateLimitPolicy::Global, identifier)
        .await
    {
        RateLimitResult::Allowed => Ok(next.run(request).await),
        RateLimitResult::Limited { retry_after } => {
            warn!(
                ip = %identifier,
                path = %request.uri().path(),
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );
            Err(ApiError::RateLimited {
                message: RateLimitPolicy::Global.message().to_string(),
                retry_after,
            }
            .into_response())
        }
    }
}
