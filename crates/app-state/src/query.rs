//! Query management
//!
//! This module provides a keyed query cache in the style of TanStack Query:
//! queries declare a [`QueryKey`] and a fetch function, results are cached as
//! JSON in a [`MemoryCache`], and writes invalidate by exact key or by scope.
//! There is no background refetching; a stale or invalidated entry is simply
//! fetched again by the next reader.
//!
//! Every key carries a generation that invalidation bumps. A fetch that was
//! started before an invalidation still returns its data to the caller but
//! never writes it to the cache.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use storage::{CacheConfig, MemoryCache};
use supabase_client::RestError;
use thiserror::Error;
use tokio::sync::RwLock;

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query fetch failed
    #[error("Query fetch failed: {0}")]
    FetchError(String),

    /// Backend rejected the request or could not be reached
    #[error("Backend error: {0}")]
    Backend(#[from] RestError),

    /// Cache error
    #[error("Cache error: {0}")]
    CacheError(#[from] storage::CacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Query key for identifying and caching queries
///
/// The scope groups related queries for invalidation (e.g. `user-favorites`),
/// the id distinguishes entries within it (typically the user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct QueryKey {
    /// Scope of the query (e.g., "beaches-with-conditions", "user-profile")
    pub scope: String,

    /// Identifier within the scope
    pub id: String,

    /// Optional parameters, kept sorted
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    /// Create a new query key
    pub fn new(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            id: id.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter to the query key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Prefix shared by every cache key in a scope
    pub fn scope_prefix(scope: &str) -> String {
        format!("query:{}:", scope)
    }

    /// Convert to cache key string
    pub fn to_cache_key(&self) -> String {
        format!("query:{}", self)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, k, v)?;
        }
        Ok(())
    }
}

/// Query state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Never fetched, or invalidated since
    Idle,

    /// Query is fetching data
    Fetching,

    /// Query fetch succeeded
    Success,

    /// Query fetch failed
    Error,
}

#[derive(Debug, Clone)]
struct QueryMeta {
    state: QueryState,
    stale_at: Option<SystemTime>,
    fetch_count: u32,
    last_error: Option<String>,
}

impl QueryMeta {
    fn new() -> Self {
        Self {
            state: QueryState::Idle,
            stale_at: None,
            fetch_count: 0,
            last_error: None,
        }
    }

    fn is_stale(&self) -> bool {
        self.stale_at.map_or(true, |at| SystemTime::now() >= at)
    }
}

/// Query configuration
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Time during which cached data is served without refetching
    pub stale_time: Duration,

    /// Time until cached data is dropped
    pub cache_time: Duration,

    /// Retry failed queries
    pub retry: bool,

    /// Maximum attempts when retrying
    pub retry_count: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            cache_time: Duration::from_secs(300), // 5 minutes
            retry: false,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Query trait for defining data fetching logic
#[async_trait]
pub trait Query: Send + Sync {
    /// The type of data this query returns
    type Data: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Fetch the data
    async fn fetch(&self) -> Result<Self::Data>;

    /// Get the query key
    fn key(&self) -> QueryKey;

    /// Get the query configuration
    fn config(&self) -> QueryConfig {
        QueryConfig::default()
    }
}

#[derive(Default)]
struct Registry {
    meta: HashMap<String, QueryMeta>,
    generations: HashMap<String, u64>,
}

impl Registry {
    fn bump(&mut self, cache_key: &str) {
        if let Some(generation) = self.generations.get_mut(cache_key) {
            *generation += 1;
        }
    }

    fn is_current(&self, cache_key: &str, generation: u64) -> bool {
        self.generations.get(cache_key) == Some(&generation)
    }
}

/// Query client for managing queries
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<MemoryCache>,
    registry: Arc<RwLock<Registry>>,
}

impl QueryClient {
    /// Create a new query client
    pub fn new(cache_config: CacheConfig) -> Self {
        Self {
            cache: Arc::new(MemoryCache::new(cache_config)),
            registry: Arc::new(RwLock::new(Registry::default())),
        }
    }

    /// Get query data, using fresh cached data if available
    pub async fn get<Q: Query>(&self, query: &Q) -> Result<Q::Data> {
        let cache_key = query.key().to_cache_key();

        let fresh = self.registry.read().await.meta.get(&cache_key).is_some_and(|m| !m.is_stale());
        if fresh {
            if let Some(data) = self.cache.get_json::<Q::Data>(&cache_key)? {
                tracing::debug!(key = %cache_key, "query cache hit");
                return Ok(data);
            }
        }

        self.fetch(query).await
    }

    /// Cached data for a query without fetching, stale or not
    pub fn peek<Q: Query>(&self, query: &Q) -> Result<Option<Q::Data>> {
        Ok(self.cache.get_json(&query.key().to_cache_key())?)
    }

    /// Fetch query data (always fetches, ignoring cache)
    pub async fn fetch<Q: Query>(&self, query: &Q) -> Result<Q::Data> {
        let cache_key = query.key().to_cache_key();
        let config = query.config();

        let generation = {
            let mut registry = self.registry.write().await;
            let query_meta = registry.meta.entry(cache_key.clone()).or_insert_with(QueryMeta::new);
            query_meta.state = QueryState::Fetching;
            query_meta.fetch_count += 1;
            *registry.generations.entry(cache_key.clone()).or_insert(0)
        };

        let max_attempts = if config.retry { config.retry_count.max(1) } else { 1 };
        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            match query.fetch().await {
                Ok(data) => break Ok(data),
                Err(e) if attempt < max_attempts => {
                    tracing::debug!(key = %cache_key, attempt, error = %e, "query failed, retrying");
                    tokio::time::sleep(config.retry_delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        let mut registry = self.registry.write().await;
        if !registry.is_current(&cache_key, generation) {
            tracing::debug!(key = %cache_key, "query invalidated while fetching, result not cached");
            return result;
        }

        match result {
            Ok(data) => {
                self.cache.put_json(cache_key.clone(), &data, Some(config.cache_time))?;

                if let Some(query_meta) = registry.meta.get_mut(&cache_key) {
                    query_meta.state = QueryState::Success;
                    query_meta.stale_at = Some(SystemTime::now() + config.stale_time);
                    query_meta.last_error = None;
                }
                Ok(data)
            }
            Err(error) => {
                if let Some(query_meta) = registry.meta.get_mut(&cache_key) {
                    query_meta.state = QueryState::Error;
                    query_meta.last_error = Some(error.to_string());
                }
                Err(error)
            }
        }
    }

    /// Invalidate cached query data
    pub async fn invalidate(&self, key: &QueryKey) {
        let cache_key = key.to_cache_key();
        let mut registry = self.registry.write().await;
        self.cache.remove(&cache_key);
        registry.meta.remove(&cache_key);
        registry.bump(&cache_key);
    }

    /// Invalidate all queries in a scope, returning how many entries went
    pub async fn invalidate_scope(&self, scope: &str) -> usize {
        let prefix = QueryKey::scope_prefix(scope);
        let mut registry = self.registry.write().await;
        let removed = self.cache.remove_prefix(&prefix);

        registry.meta.retain(|k, _| !k.starts_with(&prefix));
        for (_, generation) in registry.generations.iter_mut().filter(|(k, _)| k.starts_with(&prefix)) {
            *generation += 1;
        }

        tracing::debug!(scope, removed, "invalidated query scope");
        removed
    }

    /// Get query state
    pub async fn state(&self, key: &QueryKey) -> QueryState {
        let registry = self.registry.read().await;
        registry.meta.get(&key.to_cache_key()).map(|m| m.state).unwrap_or(QueryState::Idle)
    }

    /// Message of the last failed fetch, if the query is in the error state
    pub async fn last_error(&self, key: &QueryKey) -> Option<String> {
        let registry = self.registry.read().await;
        registry.meta.get(&key.to_cache_key()).and_then(|m| m.last_error.clone())
    }

    /// Number of fetches issued for a key since it was last invalidated
    pub async fn fetch_count(&self, key: &QueryKey) -> u32 {
        let registry = self.registry.read().await;
        registry.meta.get(&key.to_cache_key()).map(|m| m.fetch_count).unwrap_or(0)
    }

    /// Clear all cached queries
    pub async fn clear(&self) {
        let mut registry = self.registry.write().await;
        self.cache.clear();
        registry.meta.clear();
        for generation in registry.generations.values_mut() {
            *generation += 1;
        }
    }
}
