//! Backoff for transient Firestore failures.
//!
//! Delays grow as `base * 2^attempt` up to `max_delay`, with full jitter
//! and a floor of `base`. A 429 waits for the delay the server asked for.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info_span, warn, Instrument};

use crate::error::FirestoreResult;
use crate::metrics::record_retry;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Defaults overridden by `FIRESTORE_RETRY_BASE_MS` and
    /// `FIRESTORE_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let millis = |key: &str| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        let defaults = Self::default();
        Self {
            base_delay: millis("FIRESTORE_RETRY_BASE_MS").unwrap_or(defaults.base_delay),
            max_delay: millis("FIRESTORE_RETRY_MAX_MS").unwrap_or(defaults.max_delay),
            ..defaults
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32, server_delay: Option<Duration>) -> Duration {
        if let Some(delay) = server_delay {
            return delay;
        }
        let ceiling = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let floor = self.base_delay.min(ceiling);
        if ceiling.is_zero() {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(Duration::ZERO..=ceiling);
        jitter.max(floor)
    }
}

/// Run `op`, retrying network errors, 429 and 5xx. Any other error is
/// returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> FirestoreResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("firestore_attempt", operation = %operation, attempt = attempt + 1);
        let err = match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !err.is_retryable() || attempt >= config.max_retries {
            return Err(err);
        }

        let delay = config.backoff(attempt, err.retry_after_ms().map(Duration::from_millis));
        warn!(
            operation = %operation,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "Retrying Firestore request: {}",
            err
        );
        record_retry(operation);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
