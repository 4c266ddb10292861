//! UI preferences
//!
//! Color mode and locale live in a [`PreferenceStore`] owned by the
//! application root and handed to every view. Changes apply immediately in
//! memory; persisting them to the user's profile is the caller's business.

use i18n::Locale;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Light or dark appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Light appearance
    #[default]
    Light,
    /// Dark appearance
    Dark,
}

impl ColorMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Light => ColorMode::Dark,
            ColorMode::Dark => ColorMode::Light,
        }
    }

    /// Stored name (`light` / `dark`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }

    /// Parse a stored name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(ColorMode::Light),
            "dark" => Some(ColorMode::Dark),
            _ => None,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current UI preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Appearance
    pub color_mode: ColorMode,
    /// Display language
    pub locale: Locale,
}

/// Shared, observable UI preferences
#[derive(Clone)]
pub struct PreferenceStore {
    current: Arc<RwLock<UiPreferences>>,
    changes: Arc<watch::Sender<UiPreferences>>,
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(UiPreferences::default())
    }
}

impl PreferenceStore {
    /// Create a store with initial preferences
    pub fn new(initial: UiPreferences) -> Self {
        let (changes, _) = watch::channel(initial);
        Self {
            current: Arc::new(RwLock::new(initial)),
            changes: Arc::new(changes),
        }
    }

    /// Current preferences
    pub fn get(&self) -> UiPreferences {
        *self.current.read()
    }

    /// Current locale
    pub fn locale(&self) -> Locale {
        self.current.read().locale
    }

    /// Current color mode
    pub fn color_mode(&self) -> ColorMode {
        self.current.read().color_mode
    }

    /// Subscribe to preference changes
    pub fn subscribe(&self) -> watch::Receiver<UiPreferences> {
        self.changes.subscribe()
    }

    /// Switch the display language
    pub fn set_locale(&self, locale: Locale) {
        self.update(|p| p.locale = locale);
    }

    /// Switch the appearance
    pub fn set_color_mode(&self, mode: ColorMode) {
        self.update(|p| p.color_mode = mode);
    }

    /// Flip between light and dark, returning the new mode
    pub fn toggle_color_mode(&self) -> ColorMode {
        self.update(|p| p.color_mode = p.color_mode.toggled()).color_mode
    }

    /// Apply the values stored on a profile row; unknown values are ignored
    pub fn apply_stored(&self, language: Option<&str>, theme: Option<&str>) {
        let locale = language.and_then(Locale::parse);
        let mode = theme.and_then(ColorMode::parse);
        self.update(|p| {
            if let Some(locale) = locale {
                p.locale = locale;
            }
            if let Some(mode) = mode {
                p.color_mode = mode;
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut UiPreferences)) -> UiPreferences {
        let next = {
            let mut current = self.current.write();
            f(&mut current);
            *current
        };
        self.changes.send_if_modified(|published| {
            let changed = *published != next;
            *published = next;
            changed
        });
        tracing::debug!(locale = %next.locale, color_mode = %next.color_mode, "preferences updated");
        next
    }
}
