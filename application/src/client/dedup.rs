//! Collapsing of concurrent identical requests.
//!
//! The first caller for a [`RequestKey`] spawns the work as a task and
//! registers a shared handle to it; later callers with the same key await
//! that handle instead of starting another call. The task removes its own
//! registry entry before its result becomes visible, so a caller arriving
//! after settlement always starts fresh.

use futures::future::{BoxFuture, FutureExt, Shared};
use parley_domain::{ApiError, ApiResult, RequestKey};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type InFlight = Shared<BoxFuture<'static, ApiResult>>;
type Registry = Arc<Mutex<HashMap<RequestKey, InFlight>>>;

#[derive(Default)]
pub struct RequestDeduplicator {
    in_flight: Registry,
}

/// Removes the registry entry when the task ends, panics included.
struct Deregister {
    registry: Registry,
    key: RequestKey,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.key);
    }
}

impl std::fmt::Debug for RequestDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the in-flight call for `key`, or start one with `factory`.
    ///
    /// `factory` is only invoked when no call for `key` is in flight. The
    /// started task runs to completion even if every caller goes away.
    pub async fn run<F, Fut>(&self, key: RequestKey, factory: F) -> ApiResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult> + Send + 'static,
    {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!("Joining in-flight request {}", key);
                    existing.clone()
                }
                None => {
                    let work = factory();
                    let guard = Deregister {
                        registry: Arc::clone(&self.in_flight),
                        key: key.clone(),
                    };
                    // The registry lock is held until the entry is inserted, so
                    // the task cannot deregister before it is registered.
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        work.await
                    });
                    let task_key = key.clone();
                    let shared = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => {
                                warn!("Request task for {} failed: {}", task_key, e);
                                Err(ApiError::unexpected(format!("Request task failed: {}", e)))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    /// Number of logical requests currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<RequestKey, InFlight>> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
