//! Bounded exponential backoff for rate-limited calls.
//!
//! The only place in the client where a call is repeated. Attempt counters
//! are kept per [`RequestKey`] and cleared as soon as the call settles.

use parley_domain::{ApiResult, RequestKey};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    attempts: Mutex<HashMap<RequestKey, u32>>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `factory`, re-running it after a backoff while it fails with a
    /// retryable error and retries remain.
    pub async fn execute<F, Fut>(&self, key: &RequestKey, mut factory: F) -> ApiResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult>,
    {
        loop {
            let result = factory().await;
            let error = match result {
                Ok(value) => {
                    self.clear(key);
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                self.clear(key);
                return Err(error);
            }

            let attempt = self.attempts_for(key);
            if attempt >= self.max_retries {
                warn!("Giving up on {} after {} retries: {}", key, attempt, error);
                self.clear(key);
                return Err(error);
            }

            let delay = self.delay_for(attempt);
            self.lock().insert(key.clone(), attempt + 1);
            debug!(
                "Rate limited on {} (retry {}/{}), backing off {:?}",
                key,
                attempt + 1,
                self.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Retries already spent on `key` by a call still in progress.
    pub fn attempts_for(&self, key: &RequestKey) -> u32 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    fn clear(&self, key: &RequestKey) {
        self.lock().remove(key);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, u32>> {
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
