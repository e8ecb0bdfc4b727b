//! Stale-while-revalidate cache over `moka`.
//!
//! - Fresh entries are returned as-is
//! - Entries older than the stale threshold are returned immediately while a
//!   single background fetch replaces them
//! - Missing entries are fetched once no matter how many callers ask at the
//!   same time; every caller gets the same result
//! - Entries expire entirely after the time-to-live
//! - A background fetch that was overtaken by an invalidation is discarded

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use moka::future::Cache;
use tracing::{debug, warn};

use crate::gateway::ApiError;

const MAX_ENTRIES: u64 = 1000;

#[derive(Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

impl<V> Entry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }
}

/// Keys with a background fetch in flight, mapped to how many times each
/// was invalidated since that fetch started.
type InFlight = Arc<Mutex<HashMap<String, u64>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<String, u64>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keyed query results with stale-while-revalidate semantics.
#[derive(Clone)]
pub struct SwrCache<V: Clone + Send + Sync + 'static> {
    cache: Cache<String, Entry<V>>,
    stale_after: Duration,
    refreshing: InFlight,
}

impl<V: Clone + Send + Sync + 'static> SwrCache<V> {
    /// Cache whose entries live for `ttl` and revalidate after `stale_after`.
    #[must_use]
    pub fn new(ttl: Duration, stale_after: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            stale_after,
            refreshing: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Value for `key`, fetched with `fetch` when missing or stale.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there was no cached value to serve. Every
    /// caller that shared the fetch receives the same error.
    pub async fn get_or_fetch<F, Fut>(&self, key: String, fetch: F) -> Result<V, Arc<ApiError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        if let Some(entry) = self.cache.get(&key).await {
            if entry.fetched_at.elapsed() >= self.stale_after {
                self.revalidate(key, fetch());
            } else {
                debug!(%key, "query cache hit");
            }
            return Ok(entry.value);
        }

        let fut = fetch();
        self.cache
            .try_get_with(key, async move { fut.await.map(Entry::new) })
            .await
            .map(|entry| entry.value)
    }

    fn revalidate<Fut>(&self, key: String, fut: Fut)
    where
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        {
            let mut refreshing = lock(&self.refreshing);
            if refreshing.contains_key(&key) {
                return;
            }
            refreshing.insert(key.clone(), 0);
        }

        debug!(%key, "serving stale query result, revalidating");
        let cache = self.cache.clone();
        let refreshing = Arc::clone(&self.refreshing);
        tokio::spawn(async move {
            let result = fut.await;
            let overtaken = || lock(&refreshing).get(&key).is_some_and(|n| *n > 0);
            match result {
                Ok(_) if overtaken() => {
                    debug!(%key, "dropping revalidation overtaken by invalidation");
                }
                Ok(value) => {
                    cache.insert(key.clone(), Entry::new(value)).await;
                    // An invalidation may have slipped in before the insert
                    if overtaken() {
                        cache.invalidate(&key).await;
                    }
                }
                Err(e) => warn!(%key, error = %e, "query revalidation failed"),
            }
            lock(&refreshing).remove(&key);
        });
    }

    fn mark_invalidated(&self, matches: impl Fn(&str) -> bool) {
        for (key, invalidations) in lock(&self.refreshing).iter_mut() {
            if matches(key.as_str()) {
                *invalidations += 1;
            }
        }
    }

    /// Cached value for `key`, fresh or stale, without fetching.
    pub async fn peek(&self, key: &str) -> Option<V> {
        self.cache.get(key).await.map(|entry| entry.value)
    }

    /// Drop the entry for `key`.
    pub async fn invalidate(&self, key: &str) {
        self.mark_invalidated(|k| k == key);
        self.cache.invalidate(key).await;
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.mark_invalidated(|k| k.starts_with(prefix));
        let prefix = prefix.to_string();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            warn!(error = %e, "failed to invalidate query entries");
        }
    }

    /// Drop every entry.
    pub async fn invalidate_all(&self) {
        self.mark_invalidated(|_| true);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
