// Error reporting through Sentry
use tracing::info;

use crate::common::config::Environment;

/// Initializes Sentry when a DSN is configured. The returned guard flushes
/// pending events when dropped, so main keeps it alive for the process
/// lifetime.
pub fn init_sentry(dsn: Option<&str>, environment: Environment) -> Option<sentry::ClientInitGuard> {
    let Some(dsn) = dsn.filter(|d| !d.trim().is_empty()) else {
        info!("Sentry DSN not configured");
        return None;
    };

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment.as_str().into()),
            traces_sample_rate: if environment.is_production() { 0.1 } else { 1.0 },
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        info!("Sentry initialized successfully");
        Some(guard)
    } else {
        info!("Sentry DSN rejected, error reporting disabled");
        None
    }
}

/// Reports a job that exhausted its attempts
pub fn capture_job_failure(queue: &str, job_id: &str, reason: &str) {
    sentry::with_scope(
        |scope| {
            scope.set_tag("queue", queue);
            scope.set_tag("job_id", job_id);
        },
        || sentry::capture_message(&format!("Job {} failed: {}", job_id, reason), sentry::Level::Error),
    );
}
