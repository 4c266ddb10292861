//! Explore tab content
//!
//! The Explore tab shows a fixed set of lifestyle cards. Card copy is
//! Spanish-only content and is not routed through the translator; only the
//! tab header is.

use serde::Serialize;

/// Translation key of the tab title
pub const TITLE_KEY: &str = "explore";
/// Translation key of the subtitle
pub const SUBTITLE_KEY: &str = "discoverLuxuryCoastalLife";
/// Translation key of the daily inspiration banner title
pub const INSPIRATION_TITLE_KEY: &str = "dailyInspiration";
/// Translation key of the daily inspiration banner body
pub const INSPIRATION_BODY_KEY: &str = "elevateYourBeachExperience";

/// Card accent color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    /// Gold
    Gold,
    /// Coral
    Coral,
    /// Navy
    Navy,
    /// Teal
    Teal,
    /// Amber
    Amber,
    /// Emerald
    Emerald,
}

impl Accent {
    /// Palette name
    pub fn as_str(&self) -> &'static str {
        match self {
            Accent::Gold => "gold",
            Accent::Coral => "coral",
            Accent::Navy => "navy",
            Accent::Teal => "teal",
            Accent::Amber => "amber",
            Accent::Emerald => "emerald",
        }
    }
}

/// Card icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardIcon {
    /// Sun
    Sun,
    /// Sparkles
    Sparkles,
    /// Camera
    Camera,
    /// Waves
    Waves,
    /// Coffee cup
    Coffee,
    /// Palm tree
    PalmTree,
}

/// One Explore card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExploreCard {
    /// Stable id
    pub id: u8,
    /// Headline
    pub title: &'static str,
    /// One-line teaser
    pub description: &'static str,
    /// Icon
    pub icon: CardIcon,
    /// Accent color
    pub accent: Accent,
    /// Topic chips
    pub tags: &'static [&'static str],
}

static CARDS: [ExploreCard; 6] = [
    ExploreCard {
        id: 1,
        title: "Consejos para el Cuidado Solar Premium",
        description: "Descubre los secretos de una protección solar elegante y efectiva",
        icon: CardIcon::Sun,
        accent: Accent::Gold,
        tags: &["Cuidado", "Solar", "Premium"],
    },
    ExploreCard {
        id: 2,
        title: "Estilo Costero: Looks de Playa Sofisticados",
        description: "Inspírate con los últimos trends en moda playera de lujo",
        icon: CardIcon::Sparkles,
        accent: Accent::Coral,
        tags: &["Moda", "Estilo", "Lujo"],
    },
    ExploreCard {
        id: 3,
        title: "Fotografía Marina: Captura la Belleza",
        description: "Técnicas profesionales para fotografiar paisajes costeros",
        icon: CardIcon::Camera,
        accent: Accent::Navy,
        tags: &["Fotografía", "Arte", "Mar"],
    },
    ExploreCard {
        id: 4,
        title: "Wellness Costero: Meditación y Relajación",
        description: "Encuentra tu paz interior con el sonido de las olas",
        icon: CardIcon::Waves,
        accent: Accent::Teal,
        tags: &["Wellness", "Meditación", "Paz"],
    },
    ExploreCard {
        id: 5,
        title: "Gastronomía Playera Gourmet",
        description: "Sabores del mar con un toque culinario refinado",
        icon: CardIcon::Coffee,
        accent: Accent::Amber,
        tags: &["Gastronomía", "Gourmet", "Mar"],
    },
    ExploreCard {
        id: 6,
        title: "Destinos Secretos: Playas Exclusivas",
        description: "Explora rincones paradisíacos poco conocidos",
        icon: CardIcon::PalmTree,
        accent: Accent::Emerald,
        tags: &["Destinos", "Exclusivo", "Paraíso"],
    },
];

/// All cards in display order
pub fn cards() -> &'static [ExploreCard] {
    &CARDS
}

/// Look up a card by id
pub fn card(id: u8) -> Option<&'static ExploreCard> {
    CARDS.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_six_cards_with_unique_ids_and_accents() {
        assert_eq!(cards().len(), 6);

        let ids: HashSet<u8> = cards().iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 6);

        let accents: HashSet<Accent> = cards().iter().map(|c| c.accent).collect();
        assert_eq!(accents.len(), 6);

        assert!(cards().iter().all(|c| c.tags.len() == 3));
    }

    #[test]
    fn test_card_lookup() {
        let card = card(4).unwrap();
        assert_eq!(card.icon, CardIcon::Waves);
        assert_eq!(card.accent.as_str(), "teal");
        assert!(super::card(7).is_none());
    }
}
