//! In-Memory TTL Cache
//!
//! Process-wide key/value store with a per-entry expiry.
//! - Expired entries are dropped lazily when read
//! - A background sweeper purges everything expired on an interval
//! - No size bound and no LRU: the key space (coin ids, wallets) is finite

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

static GLOBAL: Lazy<Arc<MemoryCache>> = Lazy::new(|| Arc::new(MemoryCache::new()));

/// Shortest interval accepted by `spawn_sweeper`
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Cached value with its absolute expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` when `now + ttl` is past the clock's range: the entry never expires
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry, `None` once expired
    pub fn time_remaining(&self) -> Option<Duration> {
        match self.expires_at {
            Some(at) => at.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()),
            None => Some(Duration::MAX),
        }
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries found expired on read (also counted as misses)
    pub expired_on_read: u64,
    /// Entries removed by `sweep`
    pub swept: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_on_read: AtomicU64,
    swept: AtomicU64,
}

/// TTL cache keyed by string
///
/// The payload defaults to an opaque JSON value so one process-wide
/// instance can hold prices, market tables and search results alike.
#[derive(Debug)]
pub struct MemoryCache<V = Value> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    counters: Counters,
}

impl MemoryCache<Value> {
    /// Process-wide shared instance
    pub fn global() -> Arc<MemoryCache> {
        Arc::clone(&GLOBAL)
    }

    /// Serialize `value` and store it
    pub fn set_json<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Duration) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json, ttl),
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize cache value"),
        }
    }

    /// Read and deserialize a stored value
    ///
    /// A payload that no longer matches `T` is treated as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.get(key)?;
        match serde_json::from_value(json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Store a value that expires `ttl` from now, replacing any previous entry
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        self.entries.lock().insert(key.into(), entry);
    }

    /// Get a value if present and unexpired
    ///
    /// Expired entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            entries.remove(key);
            self.counters.expired_on_read.fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Return the cached value, or run `fetch`, cache its output and return it
    ///
    /// The lock is never held across `fetch`, so two concurrent misses on
    /// the same key both fetch and the last writer wins.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Remove an entry, returning it if it was still valid
    pub fn delete(&self, key: &str) -> Option<V> {
        self.entries
            .lock()
            .remove(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        self.counters.swept.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Number of stored entries (expired ones count until swept or read)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired_on_read: self.counters.expired_on_read.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    /// Start the periodic sweep on the current tokio runtime
    ///
    /// The task holds only a weak reference and exits once the cache is dropped.
    /// Intervals below one millisecond are raised to one millisecond.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    debug!("Cache dropped, stopping sweeper");
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                }
            }
        })
    }
}

impl<V: Clone> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
