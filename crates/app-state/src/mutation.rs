//! Mutation management
//!
//! Mutations run against the backend and, on success only, invalidate the
//! query keys and scopes they declare. Each mutation run carries an id; a run
//! whose id is still pending is rejected instead of racing the first one.
//! The id is released when the run settles or its future is dropped.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use supabase_client::RestError;
use thiserror::Error;

use crate::query::{QueryClient, QueryKey};

/// Mutation errors
#[derive(Debug, Error)]
pub enum MutationError {
    /// Mutation execution failed
    #[error("Mutation failed: {0}")]
    ExecutionError(String),

    /// Backend rejected the write or could not be reached
    #[error("Backend error: {0}")]
    Backend(#[from] RestError),

    /// A mutation with the same id is still pending
    #[error("Mutation already in flight: {0}")]
    InFlight(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for mutation operations
pub type Result<T> = std::result::Result<T, MutationError>;

/// Mutation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// No run with this id is outstanding
    Idle,

    /// Mutation request is outstanding
    Pending,
}

/// Mutation configuration
#[derive(Debug, Clone, Default)]
pub struct MutationConfig {
    /// Scopes to invalidate after success
    pub invalidate_scopes: Vec<String>,

    /// Specific queries to invalidate after success
    pub invalidate_keys: Vec<QueryKey>,
}

impl MutationConfig {
    /// Invalidate a whole scope on success
    pub fn invalidates_scope(mut self, scope: impl Into<String>) -> Self {
        self.invalidate_scopes.push(scope.into());
        self
    }

    /// Invalidate one key on success
    pub fn invalidates_key(mut self, key: QueryKey) -> Self {
        self.invalidate_keys.push(key);
        self
    }
}

/// Mutation trait for defining data modification logic
#[async_trait]
pub trait Mutation: Send + Sync {
    /// Input type for the mutation
    type Input: Send + Sync;

    /// Output type returned by the mutation
    type Output: Send + Sync;

    /// Execute the mutation
    async fn mutate(&self, input: Self::Input) -> Result<Self::Output>;

    /// Get mutation configuration
    fn config(&self) -> MutationConfig {
        MutationConfig::default()
    }
}

/// Holds a mutation id as pending; releases it when dropped
struct PendingRun<'a> {
    pending: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> PendingRun<'a> {
    fn begin(pending: &'a Mutex<HashSet<String>>, id: String) -> Result<Self> {
        if !pending.lock().insert(id.clone()) {
            tracing::debug!(mutation = %id, "rejecting concurrent mutation");
            return Err(MutationError::InFlight(id));
        }
        Ok(Self { pending, id })
    }
}

impl Drop for PendingRun<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// Mutation client for managing mutations
///
/// Cloning is cheap; clones share the pending set and the query cache.
#[derive(Clone)]
pub struct MutationClient {
    query_client: QueryClient,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl MutationClient {
    /// Create a new mutation client
    pub fn new(query_client: QueryClient) -> Self {
        Self {
            query_client,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Execute a mutation
    ///
    /// Fails with [`MutationError::InFlight`] without calling the backend when
    /// another run with the same `mutation_id` has not finished yet.
    pub async fn mutate<M: Mutation>(
        &self,
        mutation: &M,
        input: M::Input,
        mutation_id: impl Into<String>,
    ) -> Result<M::Output> {
        let run = PendingRun::begin(&self.pending, mutation_id.into())?;

        self.run(mutation, input).await.inspect_err(|e| {
            tracing::debug!(mutation = %run.id, error = %e, "mutation failed");
        })
    }

    /// Execute a mutation with no in-flight check
    ///
    /// Concurrent runs all reach the backend.
    pub async fn run<M: Mutation>(&self, mutation: &M, input: M::Input) -> Result<M::Output> {
        let output = mutation.mutate(input).await?;

        let config = mutation.config();
        for scope in &config.invalidate_scopes {
            self.query_client.invalidate_scope(scope).await;
        }
        for key in &config.invalidate_keys {
            self.query_client.invalidate(key).await;
        }

        Ok(output)
    }

    /// Get mutation state
    pub fn state(&self, mutation_id: &str) -> MutationState {
        if self.pending.lock().contains(mutation_id) {
            MutationState::Pending
        } else {
            MutationState::Idle
        }
    }

    /// Whether a mutation with this id is pending
    pub fn is_pending(&self, mutation_id: &str) -> bool {
        self.state(mutation_id) == MutationState::Pending
    }

    /// Number of outstanding runs
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Query client this mutation client invalidates
    pub fn query_client(&self) -> &QueryClient {
        &self.query_client
    }
}
