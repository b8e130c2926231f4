//! Time-bounded memoization.
//!
//! [`TtlCache`] stores values stamped with their write time; a read of an
//! entry older than the TTL treats it as absent and evicts it. There is no
//! background sweep, though [`TtlCache::cleanup_expired`] may be called
//! periodically.
//!
//! [`Memoized`] is the decorator form: it owns a cache and an operation
//! name, and builds keys from the operation name and the call's argument
//! values (keyword arguments sorted by name).
//!
//! Timestamps use the tokio clock so expiry can be driven by
//! `tokio::time::pause`/`advance` in tests.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

/// Size and TTL of a cache, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub name: String,
    pub size: usize,
    pub ttl_seconds: u64,
}

/// Keyed cache whose entries expire a fixed duration after being written.
pub struct TtlCache<V> {
    name: String,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a new cache with the given name (workload class) and TTL.
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a value if present and not older than the TTL.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(Instant::now(), self.ttl),
        };

        if expired {
            entries.remove(key);
            debug!(subsystem = "cache", cache = %self.name, cache_key = key, "Cache entry expired");
            return None;
        }

        debug!(subsystem = "cache", cache = %self.name, cache_key = key, "Cache hit");
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value stamped with the current time.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        debug!(subsystem = "cache", cache = %self.name, cache_key = %key, "Cache set");
        self.entries.lock().await.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        info!(subsystem = "cache", cache = %self.name, "Cache cleared");
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub async fn size(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Evict every expired entry and return how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        let removed = before - entries.len();

        if removed > 0 {
            info!(
                subsystem = "cache",
                cache = %self.name,
                removed,
                "Cleaned up expired cache entries"
            );
        }
        removed
    }

    pub async fn info(&self) -> CacheInfo {
        CacheInfo {
            name: self.name.clone(),
            size: self.size().await,
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Errors from `fetch` are returned as-is and nothing is cached. The lock
    /// is not held while `fetch` runs.
    pub async fn get_or_insert_with<F, Fut, E>(&self, key: String, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        debug!(subsystem = "cache", cache = %self.name, cache_key = %key, "Cache miss");
        let value = fetch().await?;
        self.set(key, value.clone()).await;
        Ok(value)
    }
}

/// Cache key composed from an operation name and its arguments.
///
/// Positional arguments keep their order; keyword arguments are sorted by
/// name so that call sites listing them differently share an entry. Absent
/// optional arguments are left out, and separators inside values are
/// escaped, so distinct calls never render the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    operation: String,
    args: Vec<String>,
    kwargs: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Display) -> Self {
        self.args.push(escape(&value.to_string()));
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.kwargs.push((name.into(), escape(&value.to_string())));
        self
    }

    /// Append an optional keyword argument; `None` is left out of the key.
    pub fn opt_kwarg<T: Display>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(v) => self.kwarg(name, v),
            None => self,
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kwargs: Vec<&(String, String)> = self.kwargs.iter().collect();
        kwargs.sort_by(|a, b| a.0.cmp(&b.0));

        f.write_str(&self.operation)?;
        for arg in &self.args {
            write!(f, ":{}", arg)?;
        }
        for (name, value) in kwargs {
            write!(f, ":{}={}", name, value)?;
        }
        Ok(())
    }
}

/// A named operation memoized through its own [`TtlCache`].
pub struct Memoized<V> {
    operation: String,
    cache: TtlCache<V>,
}

impl<V: Clone> Memoized<V> {
    pub fn new(operation: impl Into<String>, ttl: Duration) -> Self {
        let operation = operation.into();
        Self {
            cache: TtlCache::new(operation.clone(), ttl),
            operation,
        }
    }

    /// Start a key for one call of this operation.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.operation.clone())
    }

    /// Return the memoized result for `key`, or run `fetch` and remember it.
    pub async fn call<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.cache.get_or_insert_with(key.to_string(), fetch).await
    }

    pub async fn cache_clear(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_info(&self) -> CacheInfo {
        self.cache.info().await
    }

    pub async fn cache_cleanup(&self) -> usize {
        self.cache.cleanup_expired().await
    }
}
