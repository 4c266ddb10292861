//! Application configuration
//!
//! Backend settings come from [`ClientConfig`]; this adds where the session
//! file lives, how large the query cache may grow, and the starting locale.

use std::path::PathBuf;
use std::time::Duration;

use i18n::Locale;
use storage::CacheConfig;
use supabase_client::{ClientConfig, ConfigError};

/// Environment variable overriding the session file path
pub const ENV_SESSION_PATH: &str = "SOLYMAR_SESSION_PATH";
/// Environment variable capping the query cache entry count
pub const ENV_CACHE_ENTRIES: &str = "SOLYMAR_CACHE_MAX_ENTRIES";
/// Environment variable holding the system language
pub const ENV_LANG: &str = "LANG";

/// Session file used when none is configured
pub const DEFAULT_SESSION_FILE: &str = "solymar-session.json";

/// Everything needed to start the app
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend connection
    pub client: ClientConfig,
    /// Where the signed-in session is kept
    pub session_path: PathBuf,
    /// Query cache sizing
    pub cache: CacheConfig,
    /// Locale before any profile preference is known
    pub locale: Locale,
}

impl AppConfig {
    /// Config with defaults around a backend connection
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            session_path: PathBuf::from(DEFAULT_SESSION_FILE),
            cache: CacheConfig::default().default_ttl(Some(Duration::from_secs(300))),
            locale: Locale::default(),
        }
    }

    /// Read the config from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(ClientConfig::from_lookup(&lookup)?);

        if let Some(path) = lookup(ENV_SESSION_PATH) {
            config.session_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_CACHE_ENTRIES) {
            let entries: usize = raw.parse().map_err(|_| ConfigError::Invalid {
                var: ENV_CACHE_ENTRIES,
                reason: format!("not a number: {:?}", raw),
            })?;
            config.cache = config.cache.max_entries(entries);
        }

        if let Some(lang) = lookup(ENV_LANG) {
            // POSIX form, e.g. "de_DE.UTF-8"
            let tag = lang.split('.').next().unwrap_or_default().replace('_', "-");
            config.locale = Locale::negotiate(&[tag]);
        }

        Ok(config)
    }

    /// Set the session file path
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    /// Set the cache sizing
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the starting locale
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}
