//! Bounded retry with exponential backoff for provider calls.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

use crate::config::schema::RetryPolicy;

use super::ProviderError;

const MAX_DELAY: Duration = Duration::from_secs(10);

/// Runs `action` until it succeeds, fails permanently, or `policy.max_attempts`
/// attempts have been made. Only [`ProviderError::is_transient`] errors are retried.
///
/// Delays double from `2 * base_delay_ms`, with jitter, capped at ten seconds.
pub async fn with_retry<T, A, Fut>(
    operation: &'static str,
    policy: RetryPolicy,
    action: A,
) -> Result<T, ProviderError>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let retries = policy.max_attempts.saturating_sub(1) as usize;
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(policy.base_delay_ms.max(1))
        .max_delay(MAX_DELAY)
        .map(jitter)
        .take(retries);

    RetryIf::start(strategy, action, |e: &ProviderError| {
        let transient = e.is_transient();
        if transient {
            warn!(operation, provider = e.provider(), error = %e, "Transient provider error, retrying");
        }
        transient
    })
    .await
}
