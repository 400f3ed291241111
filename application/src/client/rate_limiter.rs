//! Per-key request spacing.
//!
//! Two calls with the same [`RequestKey`] are never started closer together
//! than the configured interval. Each `wait` reserves its slot before
//! sleeping, so concurrent waiters on one key queue up one interval apart.

use parley_domain::RequestKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Start time of the most recent (possibly future) call per key
    last_call: Mutex<HashMap<RequestKey, Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Resolve once a call with `key` may start.
    pub async fn wait(&self, key: &RequestKey) {
        let slot = self.reserve(key);
        if slot > Instant::now() {
            trace!("Rate limiting {} for {:?}", key, slot - Instant::now());
            tokio::time::sleep_until(slot).await;
        }
    }

    fn reserve(&self, key: &RequestKey) -> Instant {
        let now = Instant::now();
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let slot = match last_call.get(key) {
            Some(last) => (*last + self.min_interval).max(now),
            None => now,
        };

        // Keys whose spacing window has passed no longer constrain anything
        let min_interval = self.min_interval;
        last_call.retain(|_, last| *last + min_interval > now);
        last_call.insert(key.clone(), slot);
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::HttpMethod;
    use std::sync::Arc;

    fn key(endpoint: &str) -> RequestKey {
        RequestKey::new(HttpMethod::Get, endpoint, None)
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait(&key("/a")).await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait(&key("/a")).await;
        limiter.wait(&key("/a")).await;
        assert!(Instant::now() - start >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn different_keys_do_not_wait_on_each_other() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait(&key("/a")).await;
        limiter.wait(&key("/b")).await;
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_means_no_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait(&key("/a")).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        let before = Instant::now();
        limiter.wait(&key("/a")).await;
        assert_eq!(Instant::now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_queue_one_interval_apart() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.wait(&key("/a")).await;
                    Instant::now() - start
                })
            })
            .collect();

        let mut offsets = Vec::new();
        for handle in handles {
            offsets.push(handle.await.unwrap());
        }
        offsets.sort();
        assert!(offsets[0] < Duration::from_secs(1));
        assert!(offsets[1] >= Duration::from_secs(1));
        assert!(offsets[2] >= Duration::from_secs(2));
    }
}
