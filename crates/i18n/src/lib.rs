//! Internationalization for Solymar
//!
//! This crate provides the supported UI locales, language negotiation, and a
//! translation store loaded from Fluent resources bundled into the binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lang;
pub mod translator;

pub use lang::Locale;
pub use translator::{I18nError, Translator};
