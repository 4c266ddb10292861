//! Session gate
//!
//! The gate decides whether the user sees the auth screen or the tab shell.
//! It starts in [`GateState::Loading`], resolves to `Authenticated` or
//! `Unauthenticated` once the persisted session has been checked, and returns
//! to `Unauthenticated` on sign-out. There is no error state: failed auth
//! calls are logged and the gate stays where it was.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use supabase_client::auth::{AuthError, OAuthProvider, Session, SignUpOutcome, User};
use supabase_client::session::SessionStorage;
use supabase_client::SupabaseClient;
use tokio::sync::watch;

use crate::query::QueryClient;

/// Session-related errors
#[derive(Debug, thiserror::Error)]
pub enum SessionStateError {
    /// Auth backend error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session persistence error
    #[error("Session storage error: {0}")]
    Storage(#[from] storage::PersistenceError),

    /// Another sign-in or sign-up is being submitted
    #[error("Auth request already in progress")]
    Busy,

    /// No current session
    #[error("No current session")]
    NoCurrentSession,
}

/// Result type for session state operations
pub type Result<T> = std::result::Result<T, SessionStateError>;

/// Where the gate currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    /// Persisted session not checked yet
    Loading,
    /// No signed-in user
    Unauthenticated,
    /// Signed in
    Authenticated(Session),
}

impl GateState {
    /// Signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            GateState::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }

    /// Whether the gate is still resolving
    pub fn is_loading(&self) -> bool {
        matches!(self, GateState::Loading)
    }
}

/// Clears the submitting flag when dropped
struct Submitting<'a>(&'a AtomicBool);

impl<'a> Submitting<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SessionStateError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Holds the auth session and publishes gate transitions
///
/// Cloning is cheap; clones observe and drive the same gate.
#[derive(Clone)]
pub struct SessionGate {
    client: SupabaseClient,
    storage: Arc<dyn SessionStorage>,
    queries: QueryClient,
    state: Arc<watch::Sender<GateState>>,
    submitting: Arc<AtomicBool>,
}

impl SessionGate {
    /// Create a gate in the `Loading` state
    pub fn new(client: SupabaseClient, storage: Arc<dyn SessionStorage>, queries: QueryClient) -> Self {
        let (state, _) = watch::channel(GateState::Loading);
        Self {
            client,
            storage,
            queries,
            state: Arc::new(state),
            submitting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to gate transitions
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Current gate state
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    /// Signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Current session, if any
    pub fn current_session(&self) -> Option<Session> {
        match &*self.state.borrow() {
            GateState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Whether a sign-in or sign-up request is outstanding
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Resolve the `Loading` state from the persisted session
    ///
    /// Expired sessions are refreshed; sessions the backend no longer accepts
    /// are discarded. Never fails: every problem ends in `Unauthenticated`.
    pub async fn restore(&self) -> GateState {
        let stored = match self.storage.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(error = %e, "failed to read persisted session");
                None
            }
        };

        let Some(session) = stored else {
            tracing::info!("no persisted session");
            self.transition(GateState::Unauthenticated);
            return self.state();
        };

        match self.validate(session).await {
            Ok(session) => {
                tracing::info!(user = %session.user.id, "restored session");
                self.adopt(session).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding persisted session");
                if let Err(e) = self.storage.clear().await {
                    tracing::error!(error = %e, "failed to clear persisted session");
                }
                self.transition(GateState::Unauthenticated);
            }
        }
        self.state()
    }

    async fn validate(&self, session: Session) -> Result<Session> {
        let auth = self.client.auth();
        let session = if session.is_expired_at(Utc::now()) {
            tracing::debug!("persisted session expired, refreshing");
            auth.refresh_session(&session.refresh_token).await?
        } else {
            session
        };

        let user = auth.get_user(&session.access_token).await?;
        Ok(Session { user, ..session })
    }

    /// Sign in with e-mail and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let _submitting = Submitting::begin(&self.submitting)?;

        match self.client.auth().sign_in_with_password(email, password).await {
            Ok(session) => {
                tracing::info!(user = %session.user.id, "signed in");
                self.adopt(session).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "sign-in failed");
                Err(e.into())
            }
        }
    }

    /// Create an account; signs in when the backend returns a session
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        let _submitting = Submitting::begin(&self.submitting)?;

        match self.client.auth().sign_up(email, password, username).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                tracing::info!(user = %session.user.id, "signed up");
                self.adopt(session.clone()).await;
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(pending @ SignUpOutcome::ConfirmationPending(_)) => {
                tracing::info!("sign-up awaiting e-mail confirmation");
                Ok(pending)
            }
            Err(e) => {
                tracing::error!(error = %e, "sign-up failed");
                Err(e.into())
            }
        }
    }

    /// URL to open for an OAuth sign-in
    pub fn oauth_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> String {
        self.client.auth().authorize_url(provider, redirect_to)
    }

    /// Adopt the session handed back by an OAuth redirect
    pub async fn complete_oauth(&self, session: Session) -> Result<()> {
        let session = match self.validate(session).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "OAuth sign-in failed");
                return Err(e);
            }
        };
        tracing::info!(user = %session.user.id, "signed in with OAuth");
        self.adopt(session).await;
        Ok(())
    }

    /// Sign out locally, and on the backend when possible
    ///
    /// Local state is cleared even if the backend call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.current_session().ok_or(SessionStateError::NoCurrentSession)?;

        let remote = self.client.auth().sign_out(&session.access_token).await;
        if let Err(e) = &remote {
            tracing::error!(error = %e, "sign-out request failed");
        }

        self.client.drop_session().await;
        self.queries.clear().await;
        let cleared = self.storage.clear().await;
        self.transition(GateState::Unauthenticated);
        tracing::info!(user = %session.user.id, "signed out");

        cleared?;
        Ok(())
    }

    async fn adopt(&self, session: Session) {
        if let Err(e) = self.storage.save(&session).await {
            tracing::warn!(error = %e, "failed to persist session");
        }
        self.client.adopt_session(&session).await;
        self.transition(GateState::Authenticated(session));
    }

    fn transition(&self, next: GateState) {
        self.state.send_replace(next);
    }
}
