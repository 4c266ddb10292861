//! Tab navigation and the header bar
//!
//! The app has no routes: the shell holds which of the five tabs is active
//! and the view for that tab is rendered. Unknown tab ids select the home
//! tab.

use app_state::{ColorMode, PreferenceStore};
use i18n::{Locale, Translator};
use serde::{Deserialize, Serialize};

use crate::theme::{ColorToken, Hue, Shade};

// =============================================================================
// Tabs
// =============================================================================

/// Bottom navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    /// Today's conditions
    #[default]
    Home,
    /// Beach list
    Beaches,
    /// Favorite beaches
    Favorites,
    /// Lifestyle content
    Explore,
    /// Account and preferences
    Profile,
}

/// Icon of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TabIcon {
    /// House
    Home,
    /// Waves
    Waves,
    /// Heart
    Heart,
    /// Compass
    Compass,
    /// Person
    User,
}

impl Tab {
    /// Tabs in display order
    pub const ALL: [Tab; 5] = [Tab::Home, Tab::Beaches, Tab::Favorites, Tab::Explore, Tab::Profile];

    /// Tab id, also the translation key of its label
    pub fn id(&self) -> &'static str {
        match self {
            Tab::Home => "home",
            Tab::Beaches => "beaches",
            Tab::Favorites => "favorites",
            Tab::Explore => "explore",
            Tab::Profile => "profile",
        }
    }

    /// Tab for an id, [`Tab::Home`] when unknown
    pub fn from_id(id: &str) -> Self {
        Self::ALL.into_iter().find(|t| t.id() == id).unwrap_or_default()
    }

    /// Icon
    pub fn icon(&self) -> TabIcon {
        match self {
            Tab::Home => TabIcon::Home,
            Tab::Beaches => TabIcon::Waves,
            Tab::Favorites => TabIcon::Heart,
            Tab::Explore => TabIcon::Compass,
            Tab::Profile => TabIcon::User,
        }
    }

    /// Icon accent color
    pub fn accent(&self) -> Shade {
        match self {
            Tab::Favorites => Hue::Coral.at(500),
            Tab::Explore => Hue::Gold.at(600),
            _ => Hue::Navy.at(600),
        }
    }
}

/// Button colors of a tab in the bottom bar
///
/// Inactive tabs have a transparent background.
pub fn tab_style(active: bool, mode: ColorMode) -> ColorToken {
    match (active, mode) {
        (true, ColorMode::Light) => ColorToken { text: Hue::Navy.at(700), background: Hue::Ivory.at(100) },
        (true, ColorMode::Dark) => ColorToken { text: Hue::Gold.at(400), background: Hue::Navy.at(800) },
        (false, ColorMode::Light) => ColorToken { text: Hue::Navy.at(400), background: Hue::Ivory.at(50).alpha(0) },
        (false, ColorMode::Dark) => ColorToken { text: Hue::Navy.at(300), background: Hue::Navy.at(900).alpha(0) },
    }
}

/// One rendered entry of the bottom bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabItem {
    /// Tab
    pub tab: Tab,
    /// Localized label
    pub label: String,
    /// Icon
    pub icon: TabIcon,
    /// Whether this is the active tab
    pub active: bool,
    /// Button colors
    pub style: ColorToken,
}

/// Which tab is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TabShell {
    active: Tab,
}

impl TabShell {
    /// Shell showing the home tab
    pub fn new() -> Self {
        Self::default()
    }

    /// Active tab
    pub fn active(&self) -> Tab {
        self.active
    }

    /// Switch tabs
    pub fn select(&mut self, tab: Tab) {
        if self.active != tab {
            tracing::debug!(from = self.active.id(), to = tab.id(), "tab change");
            self.active = tab;
        }
    }

    /// Switch tabs by id
    pub fn select_id(&mut self, id: &str) -> Tab {
        self.select(Tab::from_id(id));
        self.active
    }

    /// Bottom bar entries
    pub fn items(&self, translator: &Translator, locale: Locale, mode: ColorMode) -> Vec<TabItem> {
        Tab::ALL
            .into_iter()
            .map(|tab| {
                let active = tab == self.active;
                TabItem {
                    tab,
                    label: translator.translate(locale, tab.id()).to_string(),
                    icon: tab.icon(),
                    active,
                    style: tab_style(active, mode),
                }
            })
            .collect()
    }
}

// =============================================================================
// Header
// =============================================================================

/// Entry of the language menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageOption {
    /// Locale
    pub locale: Locale,
    /// Native name
    pub name: &'static str,
    /// Flag
    pub flag: &'static str,
    /// Currently selected
    pub selected: bool,
}

/// Icon of the theme toggle: the mode it switches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeToggleIcon {
    /// Shown in light mode
    Moon,
    /// Shown in dark mode
    Sun,
}

/// Header bar state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBar {
    /// Language menu entries
    pub languages: Vec<LanguageOption>,
    /// Flag of the current language
    pub current_flag: &'static str,
    /// Theme toggle icon
    pub theme_icon: ThemeToggleIcon,
}

impl HeaderBar {
    /// Header for the current preferences
    pub fn from_preferences(preferences: &PreferenceStore) -> Self {
        let current = preferences.get();
        let languages = Locale::ALL
            .into_iter()
            .map(|locale| LanguageOption {
                locale,
                name: locale.native_name(),
                flag: locale.flag(),
                selected: locale == current.locale,
            })
            .collect();

        Self {
            languages,
            current_flag: current.locale.flag(),
            theme_icon: match current.color_mode {
                ColorMode::Light => ThemeToggleIcon::Moon,
                ColorMode::Dark => ThemeToggleIcon::Sun,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_state::UiPreferences;

    #[test]
    fn test_unknown_tab_falls_back_to_home() {
        let mut shell = TabShell::new();
        assert_eq!(shell.active(), Tab::Home);

        assert_eq!(shell.select_id("favorites"), Tab::Favorites);
        assert_eq!(shell.select_id("settings"), Tab::Home);
    }

    #[test]
    fn test_items_translate_labels_and_mark_active() {
        let translator = Translator::load().unwrap();
        let mut shell = TabShell::new();
        shell.select(Tab::Explore);

        let items = shell.items(&translator, Locale::En, ColorMode::Dark);
        assert_eq!(items.len(), 5);
        assert_eq!(items.iter().filter(|i| i.active).count(), 1);

        let explore = items.iter().find(|i| i.tab == Tab::Explore).unwrap();
        assert!(explore.active);
        assert_eq!(explore.style.text.to_string(), "gold-400");
        assert_eq!(explore.label, translator.translate(Locale::En, "explore"));
    }

    #[test]
    fn test_tab_accents() {
        assert_eq!(Tab::Favorites.accent().to_string(), "coral-500");
        assert_eq!(Tab::Explore.accent().to_string(), "gold-600");
        assert_eq!(Tab::Home.icon(), TabIcon::Home);
    }

    #[test]
    fn test_header_reflects_preferences() {
        let store = PreferenceStore::new(UiPreferences { color_mode: ColorMode::Dark, locale: Locale::De });
        let header = HeaderBar::from_preferences(&store);

        assert_eq!(header.current_flag, "🇩🇪");
        assert_eq!(header.theme_icon, ThemeToggleIcon::Sun);
        assert_eq!(header.languages.iter().filter(|l| l.selected).count(), 1);
        assert_eq!(header.languages[0].name, "Español");
    }
}
