//! Favorite beaches
//!
//! A favorite is a `(user_id, beach_id)` row in `user_favorite_beaches`.
//! Toggling and removal go through the mutation client, so a second toggle of
//! the same beach is rejected while the first is still outstanding, and the
//! cached favorites, favorite beaches and profile stats are refetched after a
//! successful write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use supabase_client::rest::{RestClient, RestError, RestRequest, RestResponse};
use thiserror::Error;
use uuid::Uuid;

use crate::beaches::{BeachWithConditions, BEACHES_TABLE, CONDITIONS_TABLE, CONDITION_COLUMNS};
use app_state::mutation::{Mutation, MutationClient, MutationConfig, MutationError};
use app_state::query::{Query, QueryKey, Result as QueryResult};

#[cfg(test)]
use mockall::automock;

/// Favorites table
pub const FAVORITES_TABLE: &str = "user_favorite_beaches";

/// Query scope of the favorite beach ids
pub const USER_FAVORITES: &str = "user-favorites";
/// Query scope of the favorite beaches with conditions
pub const FAVORITE_BEACHES: &str = "favorite-beaches";
/// Query scope of the profile stats
pub const USER_STATS: &str = "user-stats";

/// Favorite errors
#[derive(Debug, Error)]
pub enum FavoriteError {
    /// No signed-in user
    #[error("Not signed in")]
    NotAuthenticated,

    /// The same beach is already being toggled
    #[error("Favorite change already in progress for beach {0}")]
    InFlight(Uuid),

    /// Backend rejected the write
    #[error("Backend error: {0}")]
    Backend(#[from] RestError),

    /// Any other mutation failure
    #[error("Mutation error: {0}")]
    Mutation(String),
}

/// Result type for favorite operations
pub type Result<T> = std::result::Result<T, FavoriteError>;

impl FavoriteError {
    fn from_mutation(beach_id: Uuid, error: MutationError) -> Self {
        match error {
            MutationError::InFlight(_) => FavoriteError::InFlight(beach_id),
            MutationError::Backend(e) => FavoriteError::Backend(e),
            other => FavoriteError::Mutation(other.to_string()),
        }
    }
}

/// A favorites row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRow {
    /// Owner
    pub user_id: Uuid,
    /// Favorited beach
    pub beach_id: Uuid,
}

/// A favorite with its beach embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteBeach {
    /// Favorited beach id
    pub beach_id: Uuid,
    /// The beach, absent if it has since been deleted
    #[serde(default)]
    pub beaches: Option<BeachWithConditions>,
}

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    /// The beach is now a favorite
    Added,
    /// The beach is no longer a favorite
    Removed,
}

// =============================================================================
// Backend
// =============================================================================

/// Access to the favorites table
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FavoritesBackend: Send + Sync {
    /// Beach ids the user has favorited
    async fn favorite_ids(&self, user_id: Uuid) -> std::result::Result<Vec<Uuid>, RestError>;

    /// The user's favorites with each beach and its conditions
    async fn favorite_beaches(&self, user_id: Uuid) -> std::result::Result<Vec<FavoriteBeach>, RestError>;

    /// Add a favorite
    async fn insert_favorite(&self, row: FavoriteRow) -> std::result::Result<(), RestError>;

    /// Remove a favorite; removing a missing row is not an error
    async fn delete_favorite(&self, row: FavoriteRow) -> std::result::Result<(), RestError>;
}

#[derive(Deserialize)]
struct BeachIdRow {
    beach_id: Uuid,
}

#[async_trait]
impl FavoritesBackend for RestClient {
    async fn favorite_ids(&self, user_id: Uuid) -> std::result::Result<Vec<Uuid>, RestError> {
        let request = RestRequest::select(FAVORITES_TABLE, "beach_id").eq("user_id", user_id);
        let response: RestResponse<Vec<BeachIdRow>> = self.fetch(request).await?;
        Ok(response.data.into_iter().map(|r| r.beach_id).collect())
    }

    async fn favorite_beaches(&self, user_id: Uuid) -> std::result::Result<Vec<FavoriteBeach>, RestError> {
        let columns = format!("beach_id,{}(*,{}({}))", BEACHES_TABLE, CONDITIONS_TABLE, CONDITION_COLUMNS);
        let request = RestRequest::select(FAVORITES_TABLE, columns).eq("user_id", user_id);
        let response: RestResponse<Vec<FavoriteBeach>> = self.fetch(request).await?;
        Ok(response.data)
    }

    async fn insert_favorite(&self, row: FavoriteRow) -> std::result::Result<(), RestError> {
        let request = RestRequest::insert(FAVORITES_TABLE, &row)
            .map_err(|e| RestError::new(0, "ParseError", e.to_string()))?;
        self.execute(request).await?;
        Ok(())
    }

    async fn delete_favorite(&self, row: FavoriteRow) -> std::result::Result<(), RestError> {
        let request = RestRequest::delete(FAVORITES_TABLE)
            .eq("user_id", row.user_id)
            .eq("beach_id", row.beach_id);
        self.execute(request).await?;
        Ok(())
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Set of favorited beach ids for one user
#[derive(Clone)]
pub struct FavoriteIdsQuery {
    backend: Arc<dyn FavoritesBackend>,
    user_id: Uuid,
}

impl FavoriteIdsQuery {
    /// Create the query
    pub fn new(backend: Arc<dyn FavoritesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Query for FavoriteIdsQuery {
    type Data = HashSet<Uuid>;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        Ok(self.backend.favorite_ids(self.user_id).await?.into_iter().collect())
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(USER_FAVORITES, self.user_id.to_string())
    }
}

/// Favorite beaches with conditions for one user
#[derive(Clone)]
pub struct FavoriteBeachesQuery {
    backend: Arc<dyn FavoritesBackend>,
    user_id: Uuid,
}

impl FavoriteBeachesQuery {
    /// Create the query
    pub fn new(backend: Arc<dyn FavoritesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Query for FavoriteBeachesQuery {
    type Data = Vec<FavoriteBeach>;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        Ok(self.backend.favorite_beaches(self.user_id).await?)
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(FAVORITE_BEACHES, self.user_id.to_string())
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Input of [`ToggleFavoriteMutation`]
#[derive(Debug, Clone, Copy)]
pub struct ToggleFavorite {
    /// Beach to toggle
    pub beach_id: Uuid,
    /// Whether the beach is currently shown as a favorite
    pub is_favorite: bool,
}

/// Add or remove one favorite for a user
pub struct ToggleFavoriteMutation {
    backend: Arc<dyn FavoritesBackend>,
    user_id: Uuid,
}

impl ToggleFavoriteMutation {
    /// Create the mutation
    pub fn new(backend: Arc<dyn FavoritesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Mutation for ToggleFavoriteMutation {
    type Input = ToggleFavorite;
    type Output = FavoriteChange;

    async fn mutate(&self, input: Self::Input) -> app_state::mutation::Result<Self::Output> {
        let row = FavoriteRow { user_id: self.user_id, beach_id: input.beach_id };

        if input.is_favorite {
            self.backend.delete_favorite(row).await?;
            return Ok(FavoriteChange::Removed);
        }

        match self.backend.insert_favorite(row).await {
            Ok(()) => Ok(FavoriteChange::Added),
            // Already a favorite from another device
            Err(e) if e.is_conflict() => {
                tracing::debug!(beach = %input.beach_id, "favorite already present");
                Ok(FavoriteChange::Added)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn config(&self) -> MutationConfig {
        MutationConfig::default()
            .invalidates_scope(USER_FAVORITES)
            .invalidates_scope(FAVORITE_BEACHES)
            .invalidates_scope(USER_STATS)
    }
}

// =============================================================================
// Service
// =============================================================================

/// Favorite operations for the signed-in user
#[derive(Clone)]
pub struct FavoritesService {
    backend: Arc<dyn FavoritesBackend>,
    mutations: MutationClient,
}

impl FavoritesService {
    /// Create a new service
    pub fn new(backend: Arc<dyn FavoritesBackend>, mutations: MutationClient) -> Self {
        Self { backend, mutations }
    }

    /// Backend handle for building queries
    pub fn backend(&self) -> Arc<dyn FavoritesBackend> {
        Arc::clone(&self.backend)
    }

    /// Mutation id guarding one user's beach
    pub fn mutation_id(user_id: Uuid, beach_id: Uuid) -> String {
        format!("toggle-favorite:{}:{}", user_id, beach_id)
    }

    /// Whether a toggle of this beach is outstanding
    pub fn is_pending(&self, user_id: Uuid, beach_id: Uuid) -> bool {
        self.mutations.is_pending(&Self::mutation_id(user_id, beach_id))
    }

    /// Flip a beach between favorite and not
    ///
    /// Without a user nothing is sent and [`FavoriteError::NotAuthenticated`]
    /// is returned.
    pub async fn toggle(&self, user: Option<Uuid>, beach_id: Uuid, is_favorite: bool) -> Result<FavoriteChange> {
        let user_id = user.ok_or(FavoriteError::NotAuthenticated)?;
        let mutation = ToggleFavoriteMutation::new(Arc::clone(&self.backend), user_id);

        let change = self
            .mutations
            .mutate(&mutation, ToggleFavorite { beach_id, is_favorite }, Self::mutation_id(user_id, beach_id))
            .await
            .map_err(|e| FavoriteError::from_mutation(beach_id, e))?;

        tracing::info!(beach = %beach_id, ?change, "favorites updated");
        Ok(change)
    }

    /// Remove a beach from the favorites
    pub async fn remove(&self, user: Option<Uuid>, beach_id: Uuid) -> Result<()> {
        self.toggle(user, beach_id, true).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_state::query::QueryClient;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::CacheConfig;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn service(backend: impl FavoritesBackend + 'static) -> (FavoritesService, QueryClient) {
        let queries = QueryClient::new(CacheConfig::default());
        let mutations = MutationClient::new(queries.clone());
        (FavoritesService::new(Arc::new(backend), mutations), queries)
    }

    #[tokio::test]
    async fn test_toggle_requires_user() {
        let mut backend = MockFavoritesBackend::new();
        backend.expect_insert_favorite().never();
        backend.expect_delete_favorite().never();

        let (service, _) = service(backend);
        let err = service.toggle(None, Uuid::new_v4(), false).await.unwrap_err();
        assert!(matches!(err, FavoriteError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let user = Uuid::new_v4();
        let beach = Uuid::new_v4();
        let row = FavoriteRow { user_id: user, beach_id: beach };

        let mut backend = MockFavoritesBackend::new();
        backend.expect_insert_favorite().with(eq(row.clone())).times(1).returning(|_| Ok(()));
        backend.expect_delete_favorite().with(eq(row)).times(1).returning(|_| Ok(()));

        let (service, _) = service(backend);
        assert_eq!(service.toggle(Some(user), beach, false).await.unwrap(), FavoriteChange::Added);
        assert_eq!(service.toggle(Some(user), beach, true).await.unwrap(), FavoriteChange::Removed);
    }

    #[tokio::test]
    async fn test_conflict_counts_as_added() {
        let mut backend = MockFavoritesBackend::new();
        backend
            .expect_insert_favorite()
            .returning(|_| Err(RestError::new(409, "23505", "duplicate key value")));

        let (service, _) = service(backend);
        let change = service.toggle(Some(Uuid::new_v4()), Uuid::new_v4(), false).await.unwrap();
        assert_eq!(change, FavoriteChange::Added);
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let mut backend = MockFavoritesBackend::new();
        backend
            .expect_delete_favorite()
            .returning(|_| Err(RestError::new(403, "42501", "permission denied")));

        let (service, _) = service(backend);
        let err = service.remove(Some(Uuid::new_v4()), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, FavoriteError::Backend(ref e) if e.is_unauthorized()));
    }

    #[tokio::test]
    async fn test_success_refetches_favorites() {
        let user = Uuid::new_v4();
        let beach = Uuid::new_v4();
        let id_fetches = Arc::new(AtomicUsize::new(0));

        let mut backend = MockFavoritesBackend::new();
        let counter = Arc::clone(&id_fetches);
        backend.expect_favorite_ids().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });
        backend.expect_insert_favorite().returning(|_| Ok(()));

        let (service, queries) = service(backend);
        let ids = FavoriteIdsQuery::new(service.backend(), user);

        queries.get(&ids).await.unwrap();
        queries.get(&ids).await.unwrap();
        assert_eq!(id_fetches.load(Ordering::SeqCst), 1);

        service.toggle(Some(user), beach, false).await.unwrap();
        queries.get(&ids).await.unwrap();
        assert_eq!(id_fetches.load(Ordering::SeqCst), 2);
    }

    /// Hand-written backend that parks inserts until released
    struct Gated {
        release: Arc<Notify>,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl FavoritesBackend for Gated {
        async fn favorite_ids(&self, _: Uuid) -> std::result::Result<Vec<Uuid>, RestError> {
            Ok(vec![])
        }

        async fn favorite_beaches(&self, _: Uuid) -> std::result::Result<Vec<FavoriteBeach>, RestError> {
            Ok(vec![])
        }

        async fn insert_favorite(&self, _: FavoriteRow) -> std::result::Result<(), RestError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(())
        }

        async fn delete_favorite(&self, _: FavoriteRow) -> std::result::Result<(), RestError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_toggle_rejected_while_pending() {
        let release = Arc::new(Notify::new());
        let backend = Arc::new(Gated { release: Arc::clone(&release), inserts: AtomicUsize::new(0) });

        let queries = QueryClient::new(CacheConfig::default());
        let service = FavoritesService::new(backend.clone(), MutationClient::new(queries));
        let user = Uuid::new_v4();
        let beach = Uuid::new_v4();

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.toggle(Some(user), beach, false).await })
        };

        while !service.is_pending(user, beach) {
            tokio::task::yield_now().await;
        }

        let err = service.toggle(Some(user), beach, false).await.unwrap_err();
        assert!(matches!(err, FavoriteError::InFlight(id) if id == beach));

        // Other beaches are not blocked
        assert!(!service.is_pending(user, Uuid::new_v4()));

        release.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), FavoriteChange::Added);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_toggle_does_not_block_beach() {
        let release = Arc::new(Notify::new());
        let backend = Arc::new(Gated { release: Arc::clone(&release), inserts: AtomicUsize::new(0) });

        let queries = QueryClient::new(CacheConfig::default());
        let service = FavoritesService::new(backend.clone(), MutationClient::new(queries));
        let user = Uuid::new_v4();
        let beach = Uuid::new_v4();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), service.toggle(Some(user), beach, false)).await;
        assert!(abandoned.is_err());
        assert!(!service.is_pending(user, beach));

        // Let the retried insert through
        release.notify_one();
        assert_eq!(service.toggle(Some(user), beach, false).await.unwrap(), FavoriteChange::Added);
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_favorite_beach_from_wire() {
        let parsed: FavoriteBeach = serde_json::from_value(serde_json::json!({
            "beach_id": "0b6c3f4e-2a1d-4c5b-9e8f-7a6b5c4d3e2f",
            "beaches": {
                "id": "0b6c3f4e-2a1d-4c5b-9e8f-7a6b5c4d3e2f",
                "name": "Playa Norte",
                "location": "Valencia",
                "beach_conditions": []
            }
        }))
        .unwrap();

        assert_eq!(parsed.beaches.unwrap().beach.name, "Playa Norte");
    }
}
