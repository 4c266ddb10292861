//! In-memory query result cache
//!
//! Entries are JSON payloads keyed by string, evicted least-recently-used
//! first when either the entry count or the byte budget is exceeded, and
//! dropped lazily once their TTL has passed.

use lru::LruCache;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::num::NonZeroUsize;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Cache error types
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entry larger than the whole cache budget
    #[error("Entry too large: {size} bytes exceeds budget of {budget} bytes")]
    TooLarge {
        /// Size of the rejected entry
        size: usize,
        /// Configured byte budget
        budget: usize,
    },
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Maximum total payload size in bytes
    pub max_size_bytes: usize,
    /// TTL applied when `put` is called without one
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            max_size_bytes: 16 * 1024 * 1024,             // 16MB
            default_ttl: Some(Duration::from_secs(300)), // 5 minutes
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set maximum size in bytes
    pub fn max_size_bytes(mut self, bytes: usize) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Set default TTL
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    size: usize,
}

impl Inner {
    fn pop(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.pop(key)?;
        self.size = self.size.saturating_sub(entry.payload.len());
        Some(entry)
    }
}

/// LRU cache of serialized values
pub struct MemoryCache {
    inner: Mutex<Inner>,
    config: CacheConfig,
}

impl MemoryCache {
    /// Create a new memory cache
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            inner: Mutex::new(Inner { entries: LruCache::new(capacity), size: 0 }),
            config,
        }
    }

    /// Get a raw payload, treating expired entries as misses
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .peek(key)
            .is_some_and(|e| e.is_expired(SystemTime::now()));
        if expired {
            inner.pop(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }

        inner.entries.get(key).map(|e| e.payload.clone())
    }

    /// Get and deserialize a value
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Store a raw payload
    pub fn put(&self, key: impl Into<String>, payload: String, ttl: Option<Duration>) -> Result<()> {
        let size = payload.len();
        if size > self.config.max_size_bytes {
            return Err(CacheError::TooLarge { size, budget: self.config.max_size_bytes });
        }

        let key = key.into();
        let expires_at = ttl.or(self.config.default_ttl).map(|d| SystemTime::now() + d);
        let mut inner = self.inner.lock();

        inner.pop(&key);
        while inner.size + size > self.config.max_size_bytes {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.size = inner.size.saturating_sub(evicted.payload.len());
                }
                None => break,
            }
        }

        if let Some((_, evicted)) = inner.entries.push(key, Entry { payload, expires_at }) {
            inner.size = inner.size.saturating_sub(evicted.payload.len());
        }
        inner.size += size;

        Ok(())
    }

    /// Serialize and store a value
    pub fn put_json<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.put(key, payload, ttl)
    }

    /// Remove a single entry
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    /// Remove every entry whose key starts with `prefix`, returning how many went
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &keys {
            inner.pop(key);
        }
        keys.len()
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size = 0;
    }

    /// Check if a live entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries, including ones not yet found expired
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size
    }

    /// Drop expired entries eagerly
    pub fn evict_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            inner.pop(key);
        }
        expired.len()
    }
}
