// Short-lived cache of query results keyed by the exact Flux text
use crate::domain::reading::Reading;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    readings: Arc<[Reading]>,
}

#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
    /// Held while a miss is being filled so concurrent callers wait for it.
    fill: Mutex<()>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            fill: Mutex::new(()),
        }
    }

    pub async fn get(&self, query: &str) -> Option<Arc<[Reading]>> {
        let entries = self.entries.read().await;
        entries
            .get(query)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.readings.clone())
    }

    /// Cached result, or the result of `fetch` stored for the next callers.
    /// Only one fetch runs at a time; callers that queued behind it reuse its
    /// result. Errors are returned as-is and not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, query: &str, fetch: F) -> Result<Arc<[Reading]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<[Reading]>, E>>,
    {
        if let Some(hit) = self.get(query).await {
            return Ok(hit);
        }
        let _fill = self.fill.lock().await;
        if let Some(hit) = self.get(query).await {
            return Ok(hit);
        }
        let readings = fetch().await?;
        self.insert(query, readings.clone()).await;
        Ok(readings)
    }

    /// Stores the result and evicts anything expired.
    pub async fn insert(&self, query: &str, readings: Arc<[Reading]>) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            query.to_string(),
            Entry {
                stored_at: Instant::now(),
                readings,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = QueryCache::new(Duration::from_secs(10));
        let readings: Arc<[Reading]> = vec![Reading::new(Utc::now(), "A")].into();
        cache.insert("q", readings).await;

        assert_eq!(cache.get("q").await.map(|r| r.len()), Some(1));
        assert!(cache.get("other").await.is_none());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("q").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_fetch_once() {
        let cache = QueryCache::new(Duration::from_secs(10));
        let counter = AtomicUsize::new(0);
        let fetches = &counter;
        let fetch = || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            let readings: Arc<[Reading]> = vec![Reading::new(Utc::now(), "A")].into();
            Ok::<_, ()>(readings)
        };

        let (a, b) = tokio::join!(cache.get_or_fetch("q", fetch), cache.get_or_fetch("q", fetch));
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = QueryCache::new(Duration::from_secs(10));
        let failed = cache.get_or_fetch("q", || async { Err("down") }).await;
        assert_eq!(failed.unwrap_err(), "down");
        assert!(cache.get("q").await.is_none());
    }
}
