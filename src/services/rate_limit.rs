// src/services/rate_limit.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::common::ApiError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_ms: u64,
    pub max_requests: u32,
    pub plan_generation_per_hour: u32,
    pub ai_max_requests: u32,
    pub ai_window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
            plan_generation_per_hour: 5,
            ai_max_requests: 20,
            ai_window_ms: 15 * 60 * 1000,
        }
    }
}

/// Which bucket a request is counted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// Every API request, keyed by client IP
    Global,
    /// Plan generation and regeneration, keyed by user
    PlanGeneration,
    /// TTS and image requests, keyed by user
    Ai,
}

impl RateLimitPolicy {
    fn prefix(&self) -> &'static str {
        match self {
            RateLimitPolicy::Global => "global",
            RateLimitPolicy::PlanGeneration => "plan",
            RateLimitPolicy::Ai => "ai",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RateLimitPolicy::Global => "Too many requests, please try again later",
            RateLimitPolicy::PlanGeneration => "Plan generation limit exceeded. Try again later.",
            RateLimitPolicy::Ai => "AI service rate limit exceeded. Try again later.",
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }

    fn is_expired(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u32 },
}

/// In-memory fixed-window limiter shared by the middleware and handlers
#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    rate_limiter: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            window_ms = config.window_ms,
            max_requests = config.max_requests,
            plan_generation_per_hour = config.plan_generation_per_hour,
            ai_max_requests = config.ai_max_requests,
            ai_window_ms = config.ai_window_ms,
            "Initializing RateLimitService"
        );
        Self {
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn limits_for(&self, policy: RateLimitPolicy) -> (u32, Duration) {
        match policy {
            RateLimitPolicy::Global => (
                self.config.max_requests,
                Duration::from_millis(self.config.window_ms),
            ),
            RateLimitPolicy::PlanGeneration => (
                self.config.plan_generation_per_hour,
                Duration::from_secs(3600),
            ),
            RateLimitPolicy::Ai => (
                self.config.ai_max_requests,
                Duration::from_millis(self.config.ai_window_ms),
            ),
        }
    }

    /// Counts one request from `identifier` against `policy`
    pub async fn check(&self, policy: RateLimitPolicy, identifier: &str) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        let (limit, window) = self.limits_for(policy);
        let key = format!("{}:{}", policy.prefix(), identifier);
        let result = self.check_limit_for_key(&key, limit, window).await;

        match &result {
            RateLimitResult::Allowed => debug!(key = %key, "Request allowed by rate limiter"),
            RateLimitResult::Limited { retry_after } => warn!(
                key = %key,
                retry_after = retry_after,
                "Rate limit violation detected"
            ),
        }
        result
    }

    /// Like [`check`](Self::check), mapped onto the 429 API error
    pub async fn enforce(&self, policy: RateLimitPolicy, identifier: &str) -> Result<(), ApiError> {
        match self.check(policy, identifier).await {
            RateLimitResult::Allowed => Ok(()),
            RateLimitResult::Limited { retry_after } => Err(ApiError::RateLimited {
                message: policy.message().to_string(),
                retry_after,
            }),
        }
    }

    async fn check_limit_for_key(
        &self,
        key: &str,
        limit: u32,
        window_duration: Duration,
    ) -> RateLimitResult {
        let mut limiter = self.rate_limiter.write().await;

        let state = limiter
            .entry(key.to_string())
            .or_insert_with(RateLimitState::new);

        if state.is_expired(window_duration) {
            state.reset();
        }

        if state.count >= limit {
            let remaining = window_duration.saturating_sub(state.window_start.elapsed());
            let retry_after = remaining.as_secs_f64().ceil().max(1.0) as u32;
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        RateLimitResult::Allowed
    }

    /// Drops windows that have run out; called periodically from main
    pub async fn cleanup_expired(&self) {
        let longest = [
            RateLimitPolicy::Global,
            RateLimitPolicy::PlanGeneration,
            RateLimitPolicy::Ai,
        ]
        .iter()
        .map(|p| self.limits_for(*p).1)
        .max()
        .unwrap_or_default();

        let mut limiter = self.rate_limiter.write().await;
        let before = limiter.len();
        limiter.retain(|_, state| !state.is_expired(longest));
        debug!(removed = before - limiter.len(), "Cleaned up expired rate limit entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(max_requests: u32, plan_per_hour: u32) -> RateLimitService {
        RateLimitService::new(RateLimitConfig {
            max_requests,
            plan_generation_per_hour: plan_per_hour,
            ..RateLimitConfig::default()
        })
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_blocks() {
        let service = service_with(3, 5);

        for _ in 0..3 {
            assert_eq!(
                service.check(RateLimitPolicy::Global, "10.0.0.1").await,
                RateLimitResult::Allowed
            );
        }

        match service.check(RateLimitPolicy::Global, "10.0.0.1").await {
            RateLimitResult::Limited { retry_after } => {
                assert!(retry_after >= 1 && retry_after <= 900);
            }
            other => panic!("expected Limited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_policies_and_identifiers_are_separate() {
        let service = service_with(1, 1);

        assert_eq!(
            service.check(RateLimitPolicy::PlanGeneration, "U_1").await,
            RateLimitResult::Allowed
        );
        assert!(matches!(
            service.check(RateLimitPolicy::PlanGeneration, "U_1").await,
            RateLimitResult::Limited { .. }
        ));

        assert_eq!(
            service.check(RateLimitPolicy::PlanGeneration, "U_2").await,
            RateLimitResult::Allowed
        );
        assert_eq!(
            service.check(RateLimitPolicy::Ai, "U_1").await,
            RateLimitResult::Allowed
        );
    }

    #[tokio::test]
    async fn test_disabled_always_allows() {
        let service = RateLimitService::new(RateLimitConfig {
            enabled: false,
            max_requests: 0,
            ..RateLimitConfig::default()
        });
        assert_eq!(
            service.check(RateLimitPolicy::Global, "10.0.0.1").await,
            RateLimitResult::Allowed
        );
    }

    #[tokio::test]
    async fn test_window_expiry_resets_count() {
        let service = RateLimitService::new(RateLimitConfig {
            max_requests: 1,
            window_ms: 20,
            ..RateLimitConfig::default()
        });

        assert_eq!(service.check(RateLimitPolicy::Global, "ip").await, RateLimitResult::Allowed);
        assert!(matches!(
            service.check(RateLimitPolicy::Global, "ip").await,
            RateLimitResult::Limited { .. }
        ));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(service.check(RateLimitPolicy::Global, "ip").await, RateLimitResult::Allowed);
    }
}
