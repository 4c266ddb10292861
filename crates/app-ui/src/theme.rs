//! Color and gradient tokens
//!
//! Views never pick colors themselves: each derived value (occupancy band,
//! reported status, quality tier, clarity, card accent) maps to a named token
//! from the palette below, resolved per [`ColorMode`]. Tokens render as
//! `hue-stop` names (`coral-500`, `green-900/20`) that the rendering layer
//! resolves against its stylesheet.

use app_core::explore::Accent;
use app_core::{OccupancyBand, QualityTier, WaterClarity};
use app_state::ColorMode;
use serde::Serialize;
use std::fmt;

// =============================================================================
// Palette
// =============================================================================

/// Palette hues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hue {
    /// Brand navy
    Navy,
    /// Brand gold
    Gold,
    /// Brand coral
    Coral,
    /// Brand ivory
    Ivory,
    /// Green
    Green,
    /// Yellow
    Yellow,
    /// Orange
    Orange,
    /// Red
    Red,
    /// Blue
    Blue,
    /// Teal
    Teal,
    /// Amber
    Amber,
    /// Emerald
    Emerald,
    /// Neutral gray
    Gray,
}

impl Hue {
    /// Palette name
    pub fn as_str(&self) -> &'static str {
        match self {
            Hue::Navy => "navy",
            Hue::Gold => "gold",
            Hue::Coral => "coral",
            Hue::Ivory => "ivory",
            Hue::Green => "green",
            Hue::Yellow => "yellow",
            Hue::Orange => "orange",
            Hue::Red => "red",
            Hue::Blue => "blue",
            Hue::Teal => "teal",
            Hue::Amber => "amber",
            Hue::Emerald => "emerald",
            Hue::Gray => "gray",
        }
    }

    /// A stop on this hue's scale
    pub const fn at(self, stop: u16) -> Shade {
        Shade { hue: self, stop, alpha: None }
    }
}

/// One stop of a hue, optionally translucent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Shade {
    /// Hue
    pub hue: Hue,
    /// Scale stop, 50 to 900
    pub stop: u16,
    /// Opacity in percent
    pub alpha: Option<u8>,
}

impl Shade {
    /// Same shade with an opacity
    pub const fn alpha(mut self, percent: u8) -> Self {
        self.alpha = Some(percent);
        self
    }
}

impl fmt::Display for Shade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hue.as_str(), self.stop)?;
        if let Some(alpha) = self.alpha {
            write!(f, "/{}", alpha)?;
        }
        Ok(())
    }
}

/// Foreground plus background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorToken {
    /// Text and icon color
    pub text: Shade,
    /// Fill behind the text
    pub background: Shade,
}

/// Two-stop gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradientToken {
    /// Start
    pub from: Shade,
    /// End
    pub to: Shade,
}

impl GradientToken {
    /// The standard 400 to 600 sweep of one hue
    pub const fn of(hue: Hue) -> Self {
        Self { from: hue.at(400), to: hue.at(600) }
    }
}

// =============================================================================
// Token Mapping
// =============================================================================

fn band_hue(band: OccupancyBand) -> Hue {
    match band {
        OccupancyBand::Low => Hue::Green,
        OccupancyBand::Moderate => Hue::Gold,
        OccupancyBand::High => Hue::Coral,
        OccupancyBand::VeryHigh => Hue::Red,
    }
}

/// Color of an occupancy percentage, by its band
pub fn occupancy_color(band: OccupancyBand, mode: ColorMode) -> ColorToken {
    let hue = band_hue(band);
    let text = if hue == Hue::Gold { hue.at(600) } else { hue.at(500) };
    let background = match mode {
        ColorMode::Light => hue.at(50),
        ColorMode::Dark => hue.at(900).alpha(20),
    };
    ColorToken { text, background }
}

/// Badge color of a reported occupancy status
///
/// Only `low`, `moderate` and `high` have a badge color; `very_high` renders
/// neutral.
pub fn status_badge(status: OccupancyBand, mode: ColorMode) -> ColorToken {
    let hue = match status {
        OccupancyBand::VeryHigh => Hue::Gray,
        other => band_hue(other),
    };
    match mode {
        ColorMode::Light => ColorToken { text: hue.at(700), background: hue.at(100) },
        ColorMode::Dark => ColorToken { text: hue.at(400), background: hue.at(900).alpha(20) },
    }
}

/// Gradient of the occupancy meter
pub fn occupancy_gradient(band: OccupancyBand) -> GradientToken {
    GradientToken::of(match band {
        OccupancyBand::Low => Hue::Green,
        OccupancyBand::Moderate => Hue::Yellow,
        OccupancyBand::High => Hue::Orange,
        OccupancyBand::VeryHigh => Hue::Red,
    })
}

/// Text color of a water quality score
pub fn quality_color(tier: QualityTier) -> Shade {
    match tier {
        QualityTier::Excellent => Hue::Green.at(500),
        QualityTier::Good => Hue::Gold.at(600),
        QualityTier::Fair => Hue::Coral.at(500),
        QualityTier::Poor => Hue::Red.at(500),
    }
}

fn clarity_hue(clarity: WaterClarity) -> Hue {
    match clarity {
        WaterClarity::Excellent => Hue::Green,
        WaterClarity::Good => Hue::Blue,
        WaterClarity::Fair => Hue::Yellow,
        WaterClarity::Poor => Hue::Red,
    }
}

/// Text color of a clarity reading
pub fn clarity_color(clarity: WaterClarity) -> Shade {
    clarity_hue(clarity).at(500)
}

/// Gradient of the clarity meter
pub fn clarity_gradient(clarity: WaterClarity) -> GradientToken {
    GradientToken::of(clarity_hue(clarity))
}

/// Gradient behind an Explore card icon
pub fn accent_gradient(accent: Accent) -> GradientToken {
    GradientToken::of(match accent {
        Accent::Gold => Hue::Gold,
        Accent::Coral => Hue::Coral,
        Accent::Navy => Hue::Navy,
        Accent::Teal => Hue::Teal,
        Accent::Amber => Hue::Amber,
        Accent::Emerald => Hue::Emerald,
    })
}

/// Thumbnail gradient of a row on the Beaches tab
pub const BEACH_THUMBNAIL: GradientToken = GradientToken::of(Hue::Navy);

/// Thumbnail gradient of a row on the Favorites tab
pub const FAVORITE_THUMBNAIL: GradientToken = GradientToken::of(Hue::Coral);

/// Heading text color
pub fn heading(mode: ColorMode) -> Shade {
    match mode {
        ColorMode::Light => Hue::Navy.at(800),
        ColorMode::Dark => Hue::Ivory.at(100),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_names() {
        assert_eq!(Hue::Coral.at(500).to_string(), "coral-500");
        assert_eq!(Hue::Green.at(900).alpha(20).to_string(), "green-900/20");
    }

    #[test]
    fn test_occupancy_tokens_follow_band() {
        let high = occupancy_color(OccupancyBand::from_percentage(65.0), ColorMode::Light);
        assert_eq!(high.text.to_string(), "coral-500");
        assert_eq!(high.background.to_string(), "coral-50");

        let moderate = occupancy_color(OccupancyBand::from_percentage(45.0), ColorMode::Dark);
        assert_eq!(moderate.text.to_string(), "gold-600");
        assert_eq!(moderate.background.to_string(), "gold-900/20");
    }

    #[test]
    fn test_status_badge_for_reported_moderate() {
        // A reading reported as moderate keeps the moderate badge whatever its percentage
        let badge = status_badge(OccupancyBand::Moderate, ColorMode::Light);
        assert_eq!(badge.text.to_string(), "gold-700");
        assert_eq!(badge.background.to_string(), "gold-100");

        let very_high = status_badge(OccupancyBand::VeryHigh, ColorMode::Dark);
        assert_eq!(very_high.text.hue, Hue::Gray);
    }

    #[test]
    fn test_quality_color_for_score() {
        let tier = QualityTier::from_score(82.0);
        assert_eq!(quality_color(tier).to_string(), "green-500");
        assert_eq!(quality_color(QualityTier::from_score(39.0)).to_string(), "red-500");
    }

    #[test]
    fn test_gradients() {
        let g = occupancy_gradient(OccupancyBand::VeryHigh);
        assert_eq!((g.from.to_string(), g.to.to_string()), ("red-400".to_string(), "red-600".to_string()));

        assert_eq!(clarity_gradient(WaterClarity::Good).from.hue, Hue::Blue);
        assert_eq!(accent_gradient(Accent::Emerald).to.to_string(), "emerald-600");
        assert_eq!(FAVORITE_THUMBNAIL.from.to_string(), "coral-400");
    }
}
