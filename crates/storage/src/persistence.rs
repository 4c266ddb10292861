//! File-backed persisted state
//!
//! Values are wrapped in a versioned envelope carrying an MD5 checksum of the
//! serialized payload, and written through a temp file plus rename so a crash
//! never leaves a half-written file behind.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Persistence error types
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Checksum did not match the payload
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    checksum: String,
    data: T,
}

fn checksum_of<T: Serialize>(data: &T) -> Result<String> {
    let json = serde_json::to_string(data)?;
    Ok(format!("{:x}", md5::compute(json.as_bytes())))
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Path to the persistence file
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Write through a temp file and rename
    pub atomic_writes: bool,
}

impl PersistenceConfig {
    /// Create a new configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), version: 1, atomic_writes: true }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// A single value mirrored to a JSON file
pub struct PersistedState<T> {
    config: PersistenceConfig,
    current: RwLock<Option<T>>,
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync,
{
    /// Create a new persisted state; nothing is read until [`load`](Self::load)
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config, current: RwLock::new(None) }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Load from disk; a missing file yields `T::default()`
    pub async fn load(&self) -> Result<T> {
        let data = match fs::read_to_string(&self.config.path).await {
            Ok(contents) => self.decode(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(e) => return Err(e.into()),
        };

        *self.current.write().await = Some(data.clone());
        Ok(data)
    }

    /// Last loaded or stored value, loading from disk on first use
    pub async fn get(&self) -> Result<T> {
        if let Some(data) = self.current.read().await.as_ref() {
            return Ok(data.clone());
        }
        self.load().await
    }

    /// Replace the value and write it to disk
    pub async fn set(&self, data: T) -> Result<()> {
        let mut current = self.current.write().await;
        self.write(&data).await?;
        *current = Some(data);
        Ok(())
    }

    /// Reset to the default value and delete the file
    pub async fn clear(&self) -> Result<()> {
        let mut current = self.current.write().await;
        match fs::remove_file(&self.config.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *current = Some(T::default());
        Ok(())
    }

    fn decode(&self, contents: &str) -> Result<T> {
        let envelope: Envelope<T> = serde_json::from_str(contents)?;

        let computed = checksum_of(&envelope.data)?;
        if computed != envelope.checksum {
            return Err(PersistenceError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                envelope.checksum, computed
            )));
        }

        if envelope.version != self.config.version {
            return Err(PersistenceError::VersionMismatch {
                expected: self.config.version,
                found: envelope.version,
            });
        }

        Ok(envelope.data)
    }

    async fn write(&self, data: &T) -> Result<()> {
        let envelope = Envelope {
            version: self.config.version,
            checksum: checksum_of(data)?,
            data,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if !self.config.atomic_writes {
            fs::write(&self.config.path, json).await?;
            return Ok(());
        }

        let temp_path = self.config.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &self.config.path).await?;

        Ok(())
    }
}
