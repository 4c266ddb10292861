//! Solymar client core
//!
//! [`App`] owns every long-lived piece of client state: the backend clients,
//! the query and mutation caches, the session gate, UI preferences, the
//! message tables and the tab shell. A renderer asks it which root screen to
//! show and builds tab views from [`App::context`].
//!
//! ```no_run
//! use solymar::{App, AppConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! solymar::telemetry::init()?;
//! let app = App::bootstrap(AppConfig::from_env()?)?;
//! app.start().await;
//! println!("{:?}", app.root_view());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use app_core::beaches::BeachDirectory;
use app_core::profiles::ProfileQuery;
use app_core::{FavoritesService, ProfileService};
use app_state::{GateState, MutationClient, PreferenceStore, QueryClient, SessionGate, UiPreferences};
use app_ui::{HeaderBar, RootView, Tab, TabShell, ViewContext};
use i18n::Translator;
use parking_lot::Mutex;
use supabase_client::{FileSessionStorage, SessionStorage, SupabaseClient};

pub use config::AppConfig;

/// The running application
pub struct App {
    client: SupabaseClient,
    context: ViewContext,
    mutations: MutationClient,
    shell: Mutex<TabShell>,
}

impl App {
    /// Build the app with the session kept in the configured file
    pub fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(FileSessionStorage::new(&config.session_path));
        Self::with_storage(config, storage)
    }

    /// Build the app with any session storage
    pub fn with_storage(config: AppConfig, storage: Arc<dyn SessionStorage>) -> anyhow::Result<Self> {
        let client = SupabaseClient::new(config.client.clone()).context("failed to build backend client")?;
        let translator = Translator::load().context("failed to load message tables")?;

        let queries = QueryClient::new(config.cache.clone());
        let mutations = MutationClient::new(queries.clone());
        let gate = SessionGate::new(client.clone(), storage, queries.clone());
        let preferences = PreferenceStore::new(UiPreferences { locale: config.locale, ..Default::default() });

        let rest = Arc::new(client.rest().clone());
        let directory: Arc<dyn BeachDirectory> = rest.clone();

        let context = ViewContext {
            gate,
            queries,
            directory,
            favorites: FavoritesService::new(rest.clone(), mutations.clone()),
            profiles: ProfileService::new(rest, mutations.clone()),
            preferences,
            translator: Arc::new(translator),
        };

        tracing::info!(project = %config.client.project_url, locale = %config.locale, "app bootstrapped");
        Ok(Self { client, context, mutations, shell: Mutex::new(TabShell::new()) })
    }

    /// Resolve the session gate, then load the user's saved preferences
    pub async fn start(&self) -> GateState {
        let state = self.context.gate.restore().await;
        self.sync_preferences().await;
        state
    }

    /// Apply the language and theme stored on the signed-in user's profile
    ///
    /// Read failures are logged and leave the current preferences alone.
    pub async fn sync_preferences(&self) {
        let Some(user) = self.context.gate.current_user() else {
            return;
        };

        let query = ProfileQuery::new(self.context.profiles.backend(), user.id);
        match self.context.queries.get(&query).await {
            Ok(Some(profile)) => self.context.preferences.apply_stored(
                profile.preferred_language.as_deref(),
                profile.preferred_theme.as_deref(),
            ),
            Ok(None) => tracing::debug!(user = %user.id, "no profile row yet"),
            Err(e) => tracing::warn!(error = %e, "failed to load stored preferences"),
        }
    }

    /// Screen to show at the top level
    pub fn root_view(&self) -> RootView {
        RootView::resolve(&self.context.gate.state(), &self.shell.lock())
    }

    /// Switch tabs by id; unknown ids go home
    pub fn select_tab(&self, id: &str) -> Tab {
        self.shell.lock().select_id(id)
    }

    /// Active tab
    pub fn active_tab(&self) -> Tab {
        self.shell.lock().active()
    }

    /// Header bar for the current preferences
    pub fn header(&self) -> HeaderBar {
        HeaderBar::from_preferences(&self.context.preferences)
    }

    /// Shared state handed to screen loaders
    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    /// Session gate
    pub fn gate(&self) -> &SessionGate {
        &self.context.gate
    }

    /// UI preferences
    pub fn preferences(&self) -> &PreferenceStore {
        &self.context.preferences
    }

    /// Mutation client
    pub fn mutations(&self) -> &MutationClient {
        &self.mutations
    }

    /// Backend clients
    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }
}
