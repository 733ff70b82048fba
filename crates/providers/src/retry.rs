//! Bounded retry with exponential backoff for idempotent provider calls.
//!
//! Only [`ProviderError::is_transient`] failures are retried: network errors,
//! timeouts, 429 and 5xx. Everything else fails on the first attempt.
//! Each attempt is individually bounded by `attempt_timeout`.

use mascot_core::error::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times, and how patiently, to retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub base_delay: Duration,
    /// Upper bound for one attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based), plus up to 50% jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1).min(5));
        let jitter_cap = (exp.as_millis() / 2) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        exp + Duration::from_millis(jitter)
    }
}

/// The last error seen once retries stop.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    /// Attempts actually made, including the first.
    pub attempts: u32,
    pub error: ProviderError,
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;

        let outcome = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{label} did not respond within {}ms",
                policy.attempt_timeout.as_millis()
            ))),
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !error.is_transient() || attempts > policy.max_retries {
            return Err(RetryFailure { attempts, error });
        }

        let delay = policy.delay_for(attempts);
        warn!(
            call = label,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
