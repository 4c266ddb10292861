//! User interface layer for Solymar
//!
//! This crate turns application state into render-ready view models. It
//! draws nothing itself; a web or mobile renderer consumes these types.
//!
//! # Modules
//!
//! - [`theme`] - Color and gradient tokens for derived values
//! - [`navigation`] - Bottom tab bar and header bar
//! - [`screens`] - Per-tab loaders, the auth form and toasts
//!
//! # Example
//!
//! ```rust
//! use app_core::OccupancyBand;
//! use app_state::ColorMode;
//! use app_ui::navigation::{Tab, TabShell};
//! use app_ui::theme::occupancy_color;
//!
//! let mut shell = TabShell::new();
//! assert_eq!(shell.select_id("beaches"), Tab::Beaches);
//!
//! let token = occupancy_color(OccupancyBand::from_percentage(85.0), ColorMode::Light);
//! assert_eq!(token.text.to_string(), "red-500");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;
pub mod screens;
pub mod theme;

pub use navigation::{HeaderBar, LanguageOption, Tab, TabIcon, TabItem, TabShell, ThemeToggleIcon};
pub use screens::{
    AuthForm, AuthMode, AuthSubmit, BeachRow, BeachesScreen, BeachesView, ConditionsCard,
    ExploreView, FavoritesView, HomeView, Notice, ProfileView, RootView, ViewContext, ViewState,
};
pub use theme::{ColorToken, GradientToken, Hue, Shade};
