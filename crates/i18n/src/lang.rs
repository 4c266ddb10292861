//! Supported locales and language negotiation

use fluent_langneg::{negotiate_languages, NegotiationStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unic_langid::LanguageIdentifier;

/// A UI locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Spanish
    #[default]
    Es,
    /// English
    En,
    /// German
    De,
}

impl Locale {
    /// Every supported locale, default first
    pub const ALL: [Locale; 3] = [Locale::Es, Locale::En, Locale::De];

    /// Two-letter language code
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
            Locale::De => "de",
        }
    }

    /// Name of the language in that language
    pub fn native_name(&self) -> &'static str {
        match self {
            Locale::Es => "Español",
            Locale::En => "English",
            Locale::De => "Deutsch",
        }
    }

    /// Flag shown next to the name in the language selector
    pub fn flag(&self) -> &'static str {
        match self {
            Locale::Es => "🇪🇸",
            Locale::En => "🇺🇸",
            Locale::De => "🇩🇪",
        }
    }

    /// Parse an exact language code
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Language identifier for this locale
    pub fn langid(&self) -> LanguageIdentifier {
        // The codes above are valid BCP-47 primary subtags
        self.code().parse().unwrap_or_default()
    }

    /// Closest supported locale for a list of requested BCP-47 tags
    ///
    /// Tags that cannot be parsed are skipped. Falls back to [`Locale::Es`].
    ///
    /// # Examples
    /// ```
    /// use i18n::Locale;
    ///
    /// assert_eq!(Locale::negotiate(&["en-US"]), Locale::En);
    /// assert_eq!(Locale::negotiate(&["fr-FR"]), Locale::Es);
    /// ```
    pub fn negotiate<S: AsRef<str>>(requested: &[S]) -> Self {
        let requested: Vec<LanguageIdentifier> =
            requested.iter().filter_map(|tag| tag.as_ref().parse().ok()).collect();
        let available: Vec<LanguageIdentifier> = Self::ALL.iter().map(|l| l.langid()).collect();
        let default = Locale::default().langid();

        let negotiated = negotiate_languages(
            &requested,
            &available,
            Some(&default),
            NegotiationStrategy::Lookup,
        );

        negotiated
            .first()
            .and_then(|id| Self::parse(id.language.as_str()))
            .unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unsupported locale: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_spanish() {
        assert_eq!(Locale::default(), Locale::Es);
        assert_eq!(Locale::ALL[0], Locale::Es);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Locale::parse("en"), Some(Locale::En));
        assert_eq!(Locale::parse("DE"), Some(Locale::De));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!("es".parse::<Locale>(), Ok(Locale::Es));
        assert!("pt".parse::<Locale>().is_err());
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(Locale::negotiate(&["en-US"]), Locale::En);
        assert_eq!(Locale::negotiate(&["de-AT", "en"]), Locale::De);
        assert_eq!(Locale::negotiate(&["fr"]), Locale::Es);
        assert_eq!(Locale::negotiate(&["fr", "en-GB"]), Locale::En);
        assert_eq!(Locale::negotiate::<&str>(&[]), Locale::Es);
        assert_eq!(Locale::negotiate(&["not a tag!"]), Locale::Es);
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Locale::De).unwrap(), "\"de\"");
        let parsed: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Locale::En);
    }

    #[test]
    fn test_display() {
        assert_eq!(Locale::En.to_string(), "en");
        assert_eq!(Locale::De.native_name(), "Deutsch");
    }
}
