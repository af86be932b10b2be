use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::AppResult;

/// Delays slept between consecutive attempts: `initial`, `initial * m`,
/// `initial * m^2`, ... one fewer than the number of attempts.
pub fn backoff_delays(policy: &RetryPolicy) -> impl Iterator<Item = Duration> {
    let multiplier = policy.multiplier.max(1);
    let retries = policy.max_attempts.max(1) - 1;
    (0..retries).scan(policy.initial_delay, move |delay, _| {
        let current = *delay;
        *delay = delay.saturating_mul(multiplier);
        Some(current)
    })
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` attempts have been made. The error from the last
/// attempt is returned as-is. `operation` receives the 1-based attempt number.
pub async fn execute_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delays = backoff_delays(policy);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                let Some(delay) = delays.next() else {
                    warn!("{operation_name} failed after {attempt} attempts: {err}");
                    return Err(err);
                };
                warn!(
                    "{operation_name} failed (attempt {attempt}/{max_attempts}): {err}. retrying in {delay:?}"
                );
                sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
