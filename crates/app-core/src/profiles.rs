//! Profile viewing and management
//!
//! A profile row shares its id with the auth user. This module fetches the
//! row and the favorites count shown on the Profile tab, and saves the
//! language and theme preferences back to it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supabase_client::rest::{RestClient, RestError, RestRequest, RestResponse};
use supabase_client::User;
use thiserror::Error;
use uuid::Uuid;

use crate::favorites::{FAVORITES_TABLE, USER_STATS};
use app_state::mutation::{Mutation, MutationClient, MutationConfig, MutationError};
use app_state::query::{Query, QueryKey, Result as QueryResult};

#[cfg(test)]
use mockall::automock;

/// Profiles table
pub const PROFILES_TABLE: &str = "profiles";

/// Query scope of the profile row
pub const USER_PROFILE: &str = "user-profile";

/// Profile service error types
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No signed-in user
    #[error("Not signed in")]
    NotAuthenticated,

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(#[from] RestError),

    /// Any other mutation failure
    #[error("Mutation error: {0}")]
    Mutation(String),
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;

impl From<MutationError> for ProfileError {
    fn from(error: MutationError) -> Self {
        match error {
            MutationError::Backend(e) => ProfileError::Backend(e),
            other => ProfileError::Mutation(other.to_string()),
        }
    }
}

/// A `profiles` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Same as the auth user id
    pub id: Uuid,
    /// Chosen username
    #[serde(default)]
    pub username: Option<String>,
    /// Saved language code
    #[serde(default)]
    pub preferred_language: Option<String>,
    /// Saved theme, `light` or `dark`
    #[serde(default)]
    pub preferred_theme: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Counters shown on the Profile tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Number of favorite beaches
    pub favorites_count: u64,
}

/// Partial update of the preference columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New language code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    /// New theme
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_theme: Option<String>,
}

impl ProfileUpdate {
    /// Update only the language
    pub fn language(code: impl Into<String>) -> Self {
        Self { preferred_language: Some(code.into()), ..Default::default() }
    }

    /// Update only the theme
    pub fn theme(theme: impl Into<String>) -> Self {
        Self { preferred_theme: Some(theme.into()), ..Default::default() }
    }

    /// Nothing to write
    pub fn is_empty(&self) -> bool {
        self.preferred_language.is_none() && self.preferred_theme.is_none()
    }
}

/// Name shown for the user: the profile username, else the e-mail local part
pub fn display_name(profile: Option<&UserProfile>, user: &User) -> String {
    profile
        .and_then(|p| p.username.as_deref())
        .filter(|name| !name.is_empty())
        .or_else(|| user.email_local_part())
        .unwrap_or_default()
        .to_string()
}

/// Date the account was created: the profile row, else the auth user
pub fn member_since(profile: Option<&UserProfile>, user: &User) -> Option<DateTime<Utc>> {
    profile.and_then(|p| p.created_at).or(user.created_at)
}

// =============================================================================
// Backend
// =============================================================================

/// Access to the profiles table
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfilesBackend: Send + Sync {
    /// The profile row, `None` when it does not exist yet
    async fn fetch_profile(&self, user_id: Uuid) -> std::result::Result<Option<UserProfile>, RestError>;

    /// Number of favorites owned by the user
    async fn count_favorites(&self, user_id: Uuid) -> std::result::Result<u64, RestError>;

    /// Write the given columns
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> std::result::Result<(), RestError>;
}

#[async_trait]
impl ProfilesBackend for RestClient {
    async fn fetch_profile(&self, user_id: Uuid) -> std::result::Result<Option<UserProfile>, RestError> {
        let request = RestRequest::select(PROFILES_TABLE, "*").eq("id", user_id).single();
        match self.fetch::<UserProfile>(request).await {
            Ok(response) => Ok(Some(response.data)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn count_favorites(&self, user_id: Uuid) -> std::result::Result<u64, RestError> {
        self.count(RestRequest::count(FAVORITES_TABLE).eq("user_id", user_id)).await
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> std::result::Result<(), RestError> {
        let request = RestRequest::update(PROFILES_TABLE, &update)
            .map_err(|e| RestError::new(0, "ParseError", e.to_string()))?
            .eq("id", user_id);
        let _: RestResponse<()> = self.execute(request).await?;
        Ok(())
    }
}

// =============================================================================
// Queries and mutations
// =============================================================================

/// The signed-in user's profile row
#[derive(Clone)]
pub struct ProfileQuery {
    backend: Arc<dyn ProfilesBackend>,
    user_id: Uuid,
}

impl ProfileQuery {
    /// Create the query
    pub fn new(backend: Arc<dyn ProfilesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Query for ProfileQuery {
    type Data = Option<UserProfile>;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        Ok(self.backend.fetch_profile(self.user_id).await?)
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(USER_PROFILE, self.user_id.to_string())
    }
}

/// The signed-in user's counters
#[derive(Clone)]
pub struct ProfileStatsQuery {
    backend: Arc<dyn ProfilesBackend>,
    user_id: Uuid,
}

impl ProfileStatsQuery {
    /// Create the query
    pub fn new(backend: Arc<dyn ProfilesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Query for ProfileStatsQuery {
    type Data = ProfileStats;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        let favorites_count = self.backend.count_favorites(self.user_id).await?;
        Ok(ProfileStats { favorites_count })
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(USER_STATS, self.user_id.to_string())
    }
}

/// Save preference columns
pub struct UpdateProfileMutation {
    backend: Arc<dyn ProfilesBackend>,
    user_id: Uuid,
}

impl UpdateProfileMutation {
    /// Create the mutation
    pub fn new(backend: Arc<dyn ProfilesBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }
}

#[async_trait]
impl Mutation for UpdateProfileMutation {
    type Input = ProfileUpdate;
    type Output = ();

    async fn mutate(&self, input: Self::Input) -> app_state::mutation::Result<()> {
        if input.is_empty() {
            return Ok(());
        }
        self.backend.update_profile(self.user_id, input).await?;
        Ok(())
    }

    fn config(&self) -> MutationConfig {
        MutationConfig::default().invalidates_scope(USER_PROFILE)
    }
}

/// Profile operations for the signed-in user
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn ProfilesBackend>,
    mutations: MutationClient,
}

impl ProfileService {
    /// Create a new service
    pub fn new(backend: Arc<dyn ProfilesBackend>, mutations: MutationClient) -> Self {
        Self { backend, mutations }
    }

    /// Backend handle for building queries
    pub fn backend(&self) -> Arc<dyn ProfilesBackend> {
        Arc::clone(&self.backend)
    }

    /// Save preferences for the user
    ///
    /// Writes are not de-duplicated: a theme change issued while a language
    /// save is outstanding is sent as its own PATCH.
    pub async fn update(&self, user: Option<Uuid>, update: ProfileUpdate) -> Result<()> {
        let user_id = user.ok_or(ProfileError::NotAuthenticated)?;
        let mutation = UpdateProfileMutation::new(Arc::clone(&self.backend), user_id);

        self.mutations.run(&mutation, update).await?;

        tracing::info!(user = %user_id, "profile preferences saved");
        Ok(())
    }
}
