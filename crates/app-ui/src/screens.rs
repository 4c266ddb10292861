//! Screen view models
//!
//! Each tab has a loader that reads through the query cache and turns rows
//! into a render-ready view. Loaders never fail: backend errors become
//! [`ViewState::Failed`], which the renderer shows as-is (there is no retry
//! affordance). Actions such as toggling a favorite return a [`Notice`] for
//! the toast on success and the typed error otherwise.

use std::collections::HashSet;
use std::sync::Arc;

use app_core::beaches::{
    filter_beaches, BeachDirectory, BeachWithConditions, BeachesWithConditionsQuery,
    FeaturedConditionsQuery, OccupancyFilter,
};
use app_core::conditions::{ConditionsReadout, WeatherCondition};
use app_core::explore::{self, ExploreCard};
use app_core::favorites::{
    FavoriteBeachesQuery, FavoriteError, FavoriteIdsQuery, FavoritesService,
};
use app_core::profiles::{
    display_name, member_since, ProfileError, ProfileQuery, ProfileService, ProfileStatsQuery,
    ProfileUpdate,
};
use app_state::{ColorMode, GateState, PreferenceStore, QueryClient, QueryError, SessionGate};
use chrono::{DateTime, Utc};
use i18n::{Locale, Translator};
use serde::Serialize;
use supabase_client::{OAuthProvider, SignUpOutcome};
use uuid::Uuid;

use crate::navigation::{Tab, TabShell};
use crate::theme::{self, ColorToken, GradientToken, Shade};

// =============================================================================
// Shared
// =============================================================================

/// What a view currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// Waiting for data
    Loading,
    /// The view needs a signed-in user
    SignInRequired,
    /// Loaded, nothing to list
    Empty,
    /// Loaded
    Ready(T),
    /// The read failed
    Failed(String),
}

impl<T> ViewState<T> {
    /// The loaded value, if any
    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn failed(error: QueryError) -> Self {
        tracing::warn!(error = %error, "view read failed");
        ViewState::Failed(error.to_string())
    }
}

/// Toast shown after a successful action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Headline
    pub title: &'static str,
    /// Detail line
    pub description: &'static str,
}

impl Notice {
    /// After a favorite toggle
    pub const FAVORITES_UPDATED: Notice =
        Notice { title: "¡Actualizado!", description: "Tus favoritos han sido actualizados" };

    /// After removing from the Favorites tab
    pub const FAVORITE_REMOVED: Notice = Notice {
        title: "Eliminado de favoritos",
        description: "La playa ha sido removida de tus favoritos",
    };

    /// After saving language or theme
    pub const PREFERENCES_SAVED: Notice = Notice {
        title: "Configuración actualizada",
        description: "Tus preferencias han sido guardadas",
    };
}

/// Weather icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherIcon {
    /// Sun
    Sun,
    /// Sun behind a cloud
    CloudSun,
    /// Cloud
    Cloud,
    /// Rain cloud
    CloudRain,
}

impl WeatherIcon {
    /// Icon for a condition; unknown conditions show the sun
    pub fn for_condition(condition: &WeatherCondition) -> Self {
        match condition {
            WeatherCondition::PartlyCloudy => WeatherIcon::CloudSun,
            WeatherCondition::Cloudy => WeatherIcon::Cloud,
            WeatherCondition::Rainy => WeatherIcon::CloudRain,
            WeatherCondition::Sunny | WeatherCondition::Other(_) => WeatherIcon::Sun,
        }
    }
}

/// Everything a screen needs, owned by the application root
#[derive(Clone)]
pub struct ViewContext {
    /// Session gate
    pub gate: SessionGate,
    /// Query cache
    pub queries: QueryClient,
    /// Beach reads
    pub directory: Arc<dyn BeachDirectory>,
    /// Favorite reads and writes
    pub favorites: FavoritesService,
    /// Profile reads and writes
    pub profiles: ProfileService,
    /// Color mode and locale
    pub preferences: PreferenceStore,
    /// Message tables
    pub translator: Arc<Translator>,
}

impl ViewContext {
    /// Localized string for the current locale
    pub fn t(&self, key: &str) -> String {
        self.translator.translate(self.preferences.locale(), key).to_string()
    }

    fn user_id(&self) -> Option<Uuid> {
        self.gate.current_user().map(|u| u.id)
    }
}

/// Occupancy and quality fields with their tokens resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionsCard {
    /// Derived values
    pub readout: ConditionsReadout,
    /// Localized reported status
    pub status_label: String,
    /// Badge color of the reported status
    pub status_badge: ColorToken,
    /// Color of the occupancy percentage
    pub occupancy_color: ColorToken,
    /// Occupancy meter gradient
    pub occupancy_gradient: GradientToken,
    /// Color of the quality score
    pub quality_color: Shade,
    /// Clarity meter gradient
    pub clarity_gradient: GradientToken,
    /// Weather icon
    pub weather_icon: WeatherIcon,
}

impl ConditionsCard {
    fn new(readout: ConditionsReadout, ctx: &ViewContext) -> Self {
        let mode = ctx.preferences.color_mode();
        Self {
            status_label: ctx.t(readout.occupancy_status.as_str()),
            status_badge: theme::status_badge(readout.occupancy_status, mode),
            occupancy_color: theme::occupancy_color(readout.occupancy_band, mode),
            occupancy_gradient: theme::occupancy_gradient(readout.occupancy_band),
            quality_color: theme::quality_color(readout.quality_tier),
            clarity_gradient: theme::clarity_gradient(readout.water_clarity),
            weather_icon: WeatherIcon::for_condition(&readout.weather),
            readout,
        }
    }
}

// =============================================================================
// Root
// =============================================================================

/// Top-level screen choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootView {
    /// Session check in progress
    Loading,
    /// Sign-in / sign-up screen
    Auth,
    /// Tab shell showing a tab
    Shell(Tab),
}

impl RootView {
    /// Screen for a gate state
    pub fn resolve(state: &GateState, shell: &TabShell) -> Self {
        match state {
            GateState::Loading => RootView::Loading,
            GateState::Unauthenticated => RootView::Auth,
            GateState::Authenticated(_) => RootView::Shell(shell.active()),
        }
    }
}

// =============================================================================
// Auth
// =============================================================================

/// Sign-in or sign-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Existing account
    #[default]
    SignIn,
    /// New account
    SignUp,
}

/// Outcome of submitting the auth form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSubmit {
    /// The gate is now authenticated
    SignedIn,
    /// Account created, waiting for e-mail confirmation
    ConfirmationPending,
    /// Required fields are empty; nothing was sent
    Incomplete,
    /// The backend refused; details were logged
    Rejected,
}

/// State of the auth screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    /// Current mode
    pub mode: AuthMode,
    /// E-mail
    pub email: String,
    /// Password
    pub password: String,
    /// Username, used only when signing up
    pub username: String,
}

impl AuthForm {
    /// Empty sign-in form
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the form is in sign-in mode
    pub fn is_login(&self) -> bool {
        self.mode == AuthMode::SignIn
    }

    /// Switch between sign-in and sign-up
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
    }

    /// Title key for the current mode
    pub fn title_key(&self) -> &'static str {
        if self.is_login() { "signIn" } else { "createAccount" }
    }

    /// Description key for the current mode
    pub fn description_key(&self) -> &'static str {
        if self.is_login() { "signInDescription" } else { "signUpDescription" }
    }

    /// Submit button key for the current mode
    pub fn submit_key(&self) -> &'static str {
        if self.is_login() { "signIn" } else { "signUp" }
    }

    /// Key of the prompt under the form
    pub fn switch_prompt_key(&self) -> &'static str {
        if self.is_login() { "noAccount" } else { "hasAccount" }
    }

    /// Key of the mode switch link
    pub fn switch_link_key(&self) -> &'static str {
        if self.is_login() { "signUpLink" } else { "signInLink" }
    }

    /// Whether the required fields for the mode are filled
    pub fn is_complete(&self) -> bool {
        let base = !self.email.trim().is_empty() && !self.password.is_empty();
        base && (self.is_login() || !self.username.trim().is_empty())
    }

    /// Send the form through the gate
    ///
    /// Failures are logged and reported as [`AuthSubmit::Rejected`]; the gate
    /// stays unauthenticated.
    pub async fn submit(&self, gate: &SessionGate) -> AuthSubmit {
        if !self.is_complete() {
            return AuthSubmit::Incomplete;
        }

        let email = self.email.trim();
        match self.mode {
            AuthMode::SignIn => match gate.sign_in(email, &self.password).await {
                Ok(()) => AuthSubmit::SignedIn,
                Err(e) => {
                    tracing::error!(error = %e, "sign-in error");
                    AuthSubmit::Rejected
                }
            },
            AuthMode::SignUp => match gate.sign_up(email, &self.password, self.username.trim()).await {
                Ok(SignUpOutcome::SignedIn(_)) => AuthSubmit::SignedIn,
                Ok(SignUpOutcome::ConfirmationPending(_)) => AuthSubmit::ConfirmationPending,
                Err(e) => {
                    tracing::error!(error = %e, "sign-up error");
                    AuthSubmit::Rejected
                }
            },
        }
    }

    /// URL that starts the Google sign-in
    pub fn google_url(gate: &SessionGate, redirect_to: Option<&str>) -> String {
        gate.oauth_url(OAuthProvider::Google, redirect_to)
    }
}

// =============================================================================
// Home
// =============================================================================

/// Home tab
#[derive(Debug, Clone, PartialEq)]
pub struct HomeView {
    /// Welcome headline
    pub title: String,
    /// Subtitle
    pub subtitle: String,
    /// Featured beach name
    pub beach_name: String,
    /// Featured beach location
    pub location: String,
    /// Conditions card
    pub conditions: ConditionsCard,
}

/// Load the Home tab
pub async fn home(ctx: &ViewContext) -> ViewState<HomeView> {
    let featured = match ctx.queries.get(&FeaturedConditionsQuery::new(Arc::clone(&ctx.directory))).await {
        Ok(featured) => featured.unwrap_or_default(),
        Err(e) => return ViewState::failed(e),
    };

    ViewState::Ready(HomeView {
        title: ctx.t("welcomeToSolymar"),
        subtitle: ctx.t("todaysBeachConditions"),
        beach_name: featured.beach_name().to_string(),
        location: featured.location().to_string(),
        conditions: ConditionsCard::new(featured.conditions.home_readout(), ctx),
    })
}

// =============================================================================
// Beaches
// =============================================================================

/// A filter chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChip {
    /// Filter
    pub filter: OccupancyFilter,
    /// Localized label
    pub label: String,
    /// Currently selected
    pub selected: bool,
}

/// A beach in a list
#[derive(Debug, Clone, PartialEq)]
pub struct BeachRow {
    /// Beach id
    pub id: Uuid,
    /// Name
    pub name: String,
    /// Location
    pub location: String,
    /// Description
    pub description: Option<String>,
    /// Conditions, absent when the beach has no reading
    pub conditions: Option<ConditionsCard>,
    /// Whether the user has favorited it
    pub is_favorite: bool,
    /// Whether a favorite change is outstanding
    pub pending: bool,
}

impl BeachRow {
    fn build(beach: &BeachWithConditions, favorites: &HashSet<Uuid>, ctx: &ViewContext) -> Self {
        let id = beach.beach.id;
        let pending = match ctx.user_id() {
            Some(user) => ctx.favorites.is_pending(user, id),
            None => false,
        };

        Self {
            id,
            name: beach.beach.name.clone(),
            location: beach.beach.location.clone(),
            description: beach.beach.description.clone(),
            conditions: beach.conditions().map(|c| ConditionsCard::new(c.readout(), ctx)),
            is_favorite: favorites.contains(&id),
            pending,
        }
    }
}

/// Beaches tab
#[derive(Debug, Clone, PartialEq)]
pub struct BeachesView {
    /// Headline
    pub title: String,
    /// Search placeholder
    pub search_placeholder: String,
    /// Filter chips
    pub filters: Vec<FilterChip>,
    /// Matching beaches
    pub rows: Vec<BeachRow>,
}

/// Beaches tab input state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeachesScreen {
    /// Search box contents
    pub search: String,
    /// Selected filter
    pub filter: OccupancyFilter,
}

impl BeachesScreen {
    /// Load the list with the current search and filter
    pub async fn load(&self, ctx: &ViewContext) -> ViewState<BeachesView> {
        let beaches = match ctx.queries.get(&BeachesWithConditionsQuery::new(Arc::clone(&ctx.directory))).await {
            Ok(beaches) => beaches,
            Err(e) => return ViewState::failed(e),
        };

        let favorites = match ctx.user_id() {
            Some(user) => match ctx.queries.get(&FavoriteIdsQuery::new(ctx.favorites.backend(), user)).await {
                Ok(ids) => ids,
                Err(e) => return ViewState::failed(e),
            },
            None => HashSet::new(),
        };

        let mut rows = Vec::new();
        for beach in filter_beaches(&beaches, &self.search, self.filter) {
            rows.push(BeachRow::build(beach, &favorites, ctx));
        }

        let filters = OccupancyFilter::ALL
            .into_iter()
            .map(|filter| FilterChip { filter, label: ctx.t(filter.id()), selected: filter == self.filter })
            .collect();

        ViewState::Ready(BeachesView {
            title: ctx.t("discoverBeaches"),
            search_placeholder: ctx.t("searchBeaches"),
            filters,
            rows,
        })
    }

    /// Flip a beach's favorite state
    pub async fn toggle_favorite(
        &self,
        ctx: &ViewContext,
        beach_id: Uuid,
        is_favorite: bool,
    ) -> Result<Notice, FavoriteError> {
        ctx.favorites.toggle(ctx.user_id(), beach_id, is_favorite).await?;
        Ok(Notice::FAVORITES_UPDATED)
    }
}

// =============================================================================
// Favorites
// =============================================================================

/// Favorites tab
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesView {
    /// Headline
    pub title: String,
    /// Favorite beaches
    pub rows: Vec<BeachRow>,
}

/// Load the Favorites tab
///
/// Without a signed-in user nothing is fetched.
pub async fn favorites(ctx: &ViewContext) -> ViewState<FavoritesView> {
    let Some(user) = ctx.user_id() else {
        return ViewState::SignInRequired;
    };

    let favorites = match ctx.queries.get(&FavoriteBeachesQuery::new(ctx.favorites.backend(), user)).await {
        Ok(favorites) => favorites,
        Err(e) => return ViewState::failed(e),
    };

    let ids: HashSet<Uuid> = favorites.iter().map(|f| f.beach_id).collect();
    let mut rows = Vec::new();
    for beach in favorites.iter().filter_map(|f| f.beaches.as_ref()) {
        rows.push(BeachRow::build(beach, &ids, ctx));
    }

    if rows.is_empty() {
        return ViewState::Empty;
    }

    ViewState::Ready(FavoritesView { title: ctx.t("yourFavoriteBeaches"), rows })
}

/// Remove a beach from the Favorites tab
pub async fn remove_favorite(ctx: &ViewContext, beach_id: Uuid) -> Result<Notice, FavoriteError> {
    ctx.favorites.remove(ctx.user_id(), beach_id).await?;
    Ok(Notice::FAVORITE_REMOVED)
}

// =============================================================================
// Explore
// =============================================================================

/// An Explore card with its gradient resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreTile {
    /// Card content
    pub card: &'static ExploreCard,
    /// Icon gradient
    pub gradient: GradientToken,
}

/// Explore tab
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreView {
    /// Headline
    pub title: String,
    /// Subtitle
    pub subtitle: String,
    /// Banner title
    pub inspiration_title: String,
    /// Banner body
    pub inspiration_body: String,
    /// Cards
    pub tiles: Vec<ExploreTile>,
}

/// Build the Explore tab
pub fn explore(ctx: &ViewContext) -> ViewState<ExploreView> {
    ViewState::Ready(ExploreView {
        title: ctx.t(explore::TITLE_KEY),
        subtitle: ctx.t(explore::SUBTITLE_KEY),
        inspiration_title: ctx.t(explore::INSPIRATION_TITLE_KEY),
        inspiration_body: ctx.t(explore::INSPIRATION_BODY_KEY),
        tiles: explore::cards()
            .iter()
            .map(|card| ExploreTile { card, gradient: theme::accent_gradient(card.accent) })
            .collect(),
    })
}

// =============================================================================
// Profile
// =============================================================================

/// Profile tab
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    /// Username or e-mail local part
    pub display_name: String,
    /// E-mail
    pub email: Option<String>,
    /// Account creation date
    pub member_since: Option<DateTime<Utc>>,
    /// Favorites count
    pub favorites_count: u64,
    /// Current language
    pub locale: Locale,
    /// Whether dark mode is on
    pub dark_mode: bool,
}

/// Load the Profile tab
pub async fn profile(ctx: &ViewContext) -> ViewState<ProfileView> {
    let Some(user) = ctx.gate.current_user() else {
        return ViewState::SignInRequired;
    };

    let backend = ctx.profiles.backend();
    let row = match ctx.queries.get(&ProfileQuery::new(Arc::clone(&backend), user.id)).await {
        Ok(row) => row,
        Err(e) => return ViewState::failed(e),
    };
    let stats = match ctx.queries.get(&ProfileStatsQuery::new(backend, user.id)).await {
        Ok(stats) => stats,
        Err(e) => return ViewState::failed(e),
    };

    let preferences = ctx.preferences.get();
    ViewState::Ready(ProfileView {
        display_name: display_name(row.as_ref(), &user),
        email: user.email.clone(),
        member_since: member_since(row.as_ref(), &user),
        favorites_count: stats.favorites_count,
        locale: preferences.locale,
        dark_mode: preferences.color_mode == ColorMode::Dark,
    })
}

/// Switch language now and save it to the profile when signed in
///
/// Returns the toast to show, or `None` when nothing was saved.
pub async fn change_language(ctx: &ViewContext, locale: Locale) -> Result<Option<Notice>, ProfileError> {
    ctx.preferences.set_locale(locale);
    save_preference(ctx, ProfileUpdate::language(locale.code())).await
}

/// Flip the theme now and save it to the profile when signed in
pub async fn toggle_theme(ctx: &ViewContext) -> Result<Option<Notice>, ProfileError> {
    let mode = ctx.preferences.toggle_color_mode();
    save_preference(ctx, ProfileUpdate::theme(mode.as_str())).await
}

async fn save_preference(ctx: &ViewContext, update: ProfileUpdate) -> Result<Option<Notice>, ProfileError> {
    let Some(user) = ctx.user_id() else {
        return Ok(None);
    };
    ctx.profiles.update(Some(user), update).await?;
    Ok(Some(Notice::PREFERENCES_SAVED))
}

/// Sign out from the Profile tab; failures are logged
pub async fn sign_out(ctx: &ViewContext) {
    if let Err(e) = ctx.gate.sign_out().await {
        tracing::error!(error = %e, "error signing out");
    }
}
