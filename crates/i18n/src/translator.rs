//! Translation store
//!
//! Messages live in Fluent resources under `locales/<code>/main.ftl` and are
//! compiled into the binary. Every message is formatted once at load time, so
//! lookups are plain map reads and the store can be shared across threads.

use crate::lang::Locale;
use fluent::{FluentBundle, FluentResource};
use fluent_syntax::ast;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while loading translations
#[derive(Debug, Error)]
pub enum I18nError {
    /// Resource failed to parse
    #[error("Invalid Fluent resource for {locale}: {reason}")]
    Parse {
        /// Locale of the resource
        locale: Locale,
        /// Parser output
        reason: String,
    },

    /// Resource defines a message twice
    #[error("Duplicate message in {locale}: {reason}")]
    Duplicate {
        /// Locale of the resource
        locale: Locale,
        /// Bundle output
        reason: String,
    },
}

/// Result type for i18n operations
pub type Result<T> = std::result::Result<T, I18nError>;

fn bundled_source(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => include_str!("../locales/es/main.ftl"),
        Locale::En => include_str!("../locales/en/main.ftl"),
        Locale::De => include_str!("../locales/de/main.ftl"),
    }
}

/// Ids of the messages (not terms) a resource defines
fn message_ids(resource: &FluentResource) -> Vec<String> {
    resource
        .entries()
        .filter_map(|entry| match entry {
            ast::Entry::Message(message) => Some(message.id.name.to_string()),
            _ => None,
        })
        .collect()
}

fn compile(locale: Locale, source: &str) -> Result<HashMap<String, String>> {
    let resource = FluentResource::try_new(source.to_string()).map_err(|(_, errors)| I18nError::Parse {
        locale,
        reason: format!("{:?}", errors),
    })?;
    let ids = message_ids(&resource);

    let mut bundle = FluentBundle::new(vec![locale.langid()]);
    bundle.set_use_isolating(false);
    bundle
        .add_resource(resource)
        .map_err(|errors| I18nError::Duplicate { locale, reason: format!("{:?}", errors) })?;

    let mut messages = HashMap::new();
    for id in ids {
        let Some(pattern) = bundle.get_message(&id).and_then(|m| m.value()) else {
            continue;
        };
        let mut errors = Vec::new();
        let value = bundle.format_pattern(pattern, None, &mut errors);
        if !errors.is_empty() {
            tracing::warn!(%locale, %id, ?errors, "message formatted with errors");
        }
        messages.insert(id, value.into_owned());
    }

    Ok(messages)
}

/// Localized UI strings for every supported locale
#[derive(Debug, Clone)]
pub struct Translator {
    messages: HashMap<Locale, HashMap<String, String>>,
}

impl Translator {
    /// Load the bundled resources
    pub fn load() -> Result<Self> {
        Self::from_sources(Locale::ALL.into_iter().map(|l| (l, bundled_source(l))))
    }

    /// Build from explicit Fluent sources; locales without a source translate to raw keys
    pub fn from_sources<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Locale, &'a str)>,
    {
        let mut messages = HashMap::new();
        for (locale, source) in sources {
            let compiled = compile(locale, source)?;
            tracing::debug!(%locale, count = compiled.len(), "loaded translations");
            messages.insert(locale, compiled);
        }
        Ok(Self { messages })
    }

    /// String for `key` in `locale`, or `key` itself when there is none
    ///
    /// # Examples
    /// ```
    /// use i18n::{Locale, Translator};
    ///
    /// let translator = Translator::load().unwrap();
    /// assert_eq!(translator.translate(Locale::En, "home"), "Home");
    /// assert_eq!(translator.translate(Locale::En, "no_such_key"), "no_such_key");
    /// ```
    pub fn translate<'a>(&'a self, locale: Locale, key: &'a str) -> &'a str {
        self.lookup(locale, key).unwrap_or(key)
    }

    /// String for `key` in `locale`, if present
    pub fn lookup(&self, locale: Locale, key: &str) -> Option<&str> {
        self.messages.get(&locale)?.get(key).map(String::as_str)
    }

    /// Whether `key` exists in `locale`
    pub fn contains(&self, locale: Locale, key: &str) -> bool {
        self.lookup(locale, key).is_some()
    }

    /// Keys known for a locale
    pub fn keys(&self, locale: Locale) -> impl Iterator<Item = &str> {
        self.messages.get(&locale).into_iter().flat_map(|m| m.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_keys() {
        let translator = Translator::load().unwrap();

        assert_eq!(translator.translate(Locale::Es, "home"), "Inicio");
        assert_eq!(translator.translate(Locale::En, "home"), "Home");
        assert_eq!(translator.translate(Locale::De, "home"), "Startseite");
        assert_eq!(translator.translate(Locale::En, "noAccount"), "Don't have an account?");
        assert_eq!(translator.translate(Locale::Es, "very_high"), "Muy Alta");
    }

    #[test]
    fn test_distinct_strings_per_locale() {
        let translator = Translator::load().unwrap();

        let values: Vec<&str> = Locale::ALL
            .iter()
            .map(|l| translator.translate(*l, "waterQuality"))
            .collect();
        assert!(values.iter().all(|v| !v.is_empty()));
        assert_ne!(values[0], values[1]);
        assert_ne!(values[1], values[2]);
        assert_ne!(values[0], values[2]);
    }

    #[test]
    fn test_missing_key_returns_key() {
        let translator = Translator::load().unwrap();
        for locale in Locale::ALL {
            assert_eq!(translator.translate(locale, "definitely_missing"), "definitely_missing");
            assert!(!translator.contains(locale, "definitely_missing"));
        }
    }

    #[test]
    fn test_locales_share_key_set() {
        let translator = Translator::load().unwrap();

        let mut es: Vec<&str> = translator.keys(Locale::Es).collect();
        let mut en: Vec<&str> = translator.keys(Locale::En).collect();
        let mut de: Vec<&str> = translator.keys(Locale::De).collect();
        es.sort_unstable();
        en.sort_unstable();
        de.sort_unstable();

        assert_eq!(es.len(), 62);
        assert_eq!(es, en);
        assert_eq!(en, de);
    }

    #[test]
    fn test_no_bidi_isolation_marks() {
        let translator = Translator::load().unwrap();
        let value = translator.translate(Locale::De, "signOut");
        assert_eq!(value, "Abmelden");
        assert!(!value.contains('\u{2068}'));
    }

    #[test]
    fn test_from_sources_partial() {
        let translator = Translator::from_sources([(Locale::En, "greeting = Hello\n# note\n")]).unwrap();
        assert_eq!(translator.translate(Locale::En, "greeting"), "Hello");
        assert_eq!(translator.translate(Locale::De, "greeting"), "greeting");
    }

    #[test]
    fn test_parse_error() {
        let err = Translator::from_sources([(Locale::En, "= no id\n")]).unwrap_err();
        assert!(matches!(err, I18nError::Parse { locale: Locale::En, .. }));
    }

    #[test]
    fn test_message_ids_skip_comments_and_terms() {
        let source = "# c\n## Section\nhome=Home\n-brand = Solymar\nwelcome =\n    Hola\n    y bienvenido\n";
        let resource =
            FluentResource::try_new(source.to_string()).unwrap_or_else(|(_, errors)| panic!("{:?}", errors));
        assert_eq!(message_ids(&resource), vec!["home", "welcome"]);
    }

    #[test]
    fn test_multiline_and_unspaced_messages_load() {
        let source = "home=Home\nwelcome =\n    Hola\n    y bienvenido\n";
        let translator = Translator::from_sources([(Locale::Es, source)]).unwrap();

        assert_eq!(translator.translate(Locale::Es, "home"), "Home");
        assert_eq!(translator.translate(Locale::Es, "welcome"), "Hola\ny bienvenido");
    }
}
