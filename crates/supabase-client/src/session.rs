//! Session persistence
//!
//! The signed-in session is the only thing the client keeps between runs.
//! [`FileSessionStorage`] mirrors it to a checksummed JSON file;
//! [`MemorySessionStorage`] keeps it for the life of the process only.

use crate::auth::Session;
use async_trait::async_trait;
use std::path::PathBuf;
use storage::{PersistedState, PersistenceConfig, PersistenceError};
use tokio::sync::RwLock;

/// Schema version of the persisted session file
pub const SESSION_FILE_VERSION: u32 = 1;

/// Where the current session is kept between restarts
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read the stored session, if any
    async fn load(&self) -> Result<Option<Session>, PersistenceError>;

    /// Replace the stored session
    async fn save(&self, session: &Session) -> Result<(), PersistenceError>;

    /// Forget the stored session
    async fn clear(&self) -> Result<(), PersistenceError>;
}

/// Session kept in a file on disk
pub struct FileSessionStorage {
    state: PersistedState<Option<Session>>,
}

impl FileSessionStorage {
    /// Store the session at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let config = PersistenceConfig::new(path).version(SESSION_FILE_VERSION);
        Self { state: PersistedState::new(config) }
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> Result<Option<Session>, PersistenceError> {
        match self.state.load().await {
            Ok(session) => Ok(session),
            Err(e @ (PersistenceError::Corruption(_) | PersistenceError::VersionMismatch { .. })) => {
                tracing::warn!(error = %e, path = %self.state.path().display(), "discarding unreadable session file");
                self.state.clear().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        self.state.set(Some(session.clone())).await
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.state.clear().await
    }
}

/// Session kept in memory only
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: RwLock<Option<Session>>,
}

impl MemorySessionStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Result<Option<Session>, PersistenceError> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        *self.slot.write().await = None;
        Ok(())
    }
}
