//! In-process query cache
//!
//! Server responses are cached under an ordered [`QueryKey`] such as
//! `["my-exam-result", "42"]`. Entries go stale after a per-query stale time
//! or when invalidated, and concurrent fetches of the same key are collapsed
//! into one request.
//!
//! # Example
//!
//! ```rust,ignore
//! use hakwonplus::cache::{QueryCache, QueryKey};
//!
//! let cache = QueryCache::new();
//! let key = QueryKey::new("exams").with("regular");
//! let exams: Vec<Exam> = cache
//!     .fetch_with(&key, Duration::from_secs(30), || client.exams().list(None))
//!     .await?;
//!
//! // After a mutation
//! cache.invalidate_prefix(&QueryKey::new("exams"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::Result;

// ============================================================================
// Keys
// ============================================================================

/// Ordered cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    /// Append a segment
    pub fn with(mut self, segment: impl fmt::Display) -> Self {
        self.0.push(segment.to_string());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when `prefix`'s segments lead this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Stored from a successful fetch
    Success,
    /// Marked stale by an invalidation; next read refetches
    Invalidated,
}

/// Cached response
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub fetched_at: Instant,
    pub status: EntryStatus,
}

impl CacheEntry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        self.status == EntryStatus::Success && self.fetched_at.elapsed() < stale_time
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry
    pub hits: u64,
    /// Reads that had to fetch
    pub misses: u64,
    /// Entries currently stored
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Default)]
struct Inner {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    in_flight: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Shared keyed store; clones see the same entries
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        match self.inner.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        match self.inner.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.read().get(key).cloned()
    }

    /// Typed read of a stored entry, fresh or not
    pub fn get_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.get(key)?;
        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached entry has unexpected shape");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<()> {
        let data = serde_json::to_value(data)?;
        self.write().insert(
            key.clone(),
            CacheEntry {
                data,
                fetched_at: Instant::now(),
                status: EntryStatus::Success,
            },
        );
        Ok(())
    }

    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.read()
            .get(key)
            .is_some_and(|entry| entry.is_fresh(stale_time))
    }

    /// Mark one key stale; returns whether it existed
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.write().get_mut(key) {
            Some(entry) => {
                entry.status = EntryStatus::Invalidated;
                tracing::debug!(key = %key, "Invalidated cache entry");
                true
            }
            None => false,
        }
    }

    /// Mark every key under `prefix` stale; returns the count
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.write();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.status = EntryStatus::Invalidated;
                count += 1;
            }
        }
        tracing::debug!(prefix = %prefix, count, "Invalidated cache entries");
        count
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.write().remove(key)
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        self.write().clear();
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            entries: self.read().len(),
        }
    }

    fn key_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.inner.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Forget the per-key lock once no other caller holds it
    fn release_key_lock(&self, key: &QueryKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = match self.inner.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // one reference in the map, one held here
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.inner.in_flight.lock().map(|l| l.len()).unwrap_or_default()
    }

    fn fresh_data<T: DeserializeOwned>(&self, key: &QueryKey, stale_time: Duration) -> Option<T> {
        let data = {
            let entries = self.read();
            let entry = entries.get(key).filter(|e| e.is_fresh(stale_time))?;
            entry.data.clone()
        };
        serde_json::from_value(data).ok()
    }

    /// Serve `key` from cache or fetch it
    ///
    /// Only one fetch per key runs at a time; callers that waited on it are
    /// served from the entry it stored. Errors are returned to every caller
    /// that ran the fetcher and are never cached.
    pub async fn fetch_with<T, F, Fut>(&self, key: &QueryKey, stale_time: Duration, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(data) = self.fresh_data(key, stale_time) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Query cache hit");
            return Ok(data);
        }

        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(key, stale_time, fetcher).await
        };
        self.release_key_lock(key, lock);
        result
    }

    async fn fetch_locked<T, F, Fut>(&self, key: &QueryKey, stale_time: Duration, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(data) = self.fresh_data(key, stale_time) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "Query served by concurrent fetch");
            return Ok(data);
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key = %key, "Query cache miss");

        let data = fetcher().await?;
        if let Err(e) = self.set(key, &data) {
            tracing::warn!(key = %key, error = %e, "Failed to cache query result");
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_key_prefix_and_display() {
        let key = QueryKey::new("attendance").with(7);
        assert!(key.starts_with(&QueryKey::new("attendance")));
        assert!(!key.starts_with(&QueryKey::new("attendance").with(8)));
        assert_eq!(key.to_string(), "[attendance, 7]");
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            entries: 3,
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_respects_stale_time() {
        let cache = QueryCache::new();
        let key = QueryKey::new("exams");
        let calls = AtomicUsize::new(0);
        let stale = Duration::from_secs(30);

        for _ in 0..2 {
            let value: u32 = cache
                .fetch_with(&key, stale, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await
                .unwrap();
            assert_eq!(value, 5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let _: u32 = cache
            .fetch_with(&key, stale, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(6)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::new();
        let key = QueryKey::new("attendance").with(1);
        cache.set(&key, &vec![1, 2]).unwrap();
        assert!(cache.is_fresh(&key, Duration::from_secs(60)));

        assert_eq!(cache.invalidate_prefix(&QueryKey::new("attendance")), 1);
        assert!(!cache.is_fresh(&key, Duration::from_secs(60)));

        let value: Vec<u32> = cache
            .fetch_with(&key, Duration::from_secs(60), || async { Ok(vec![3]) })
            .await
            .unwrap();
        assert_eq!(value, vec![3]);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = QueryCache::new();
        let key = QueryKey::new("program");
        let result: Result<u32> = cache
            .fetch_with(&key, Duration::from_secs(60), || async { Err(Error::other("boom")) })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let cache = QueryCache::new();
        let key = QueryKey::new("my-exam-result").with(42);
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .fetch_with(&key, Duration::from_secs(60), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, Error>(42u32)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight_len(), 0);
    }
}
