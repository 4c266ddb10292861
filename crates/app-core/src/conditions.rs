//! Beach conditions and their derived presentation fields
//!
//! Raw `beach_conditions` rows arrive with every numeric field nullable. The
//! functions here turn them into display-ready bands, tiers and star counts,
//! substituting the documented fallbacks for missing values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Air temperature shown on the home card when none is reported
pub const HOME_AIR_TEMPERATURE: f64 = 28.0;
/// Water temperature shown on the home card when none is reported
pub const HOME_WATER_TEMPERATURE: f64 = 24.0;
/// UV index shown on the home card when none is reported
pub const HOME_UV_INDEX: f64 = 8.0;
/// Upper bound of the UV scale as displayed
pub const UV_SCALE_MAX: u8 = 10;

// =============================================================================
// Occupancy
// =============================================================================

/// Occupancy band of a beach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyBand {
    /// Below 30 %
    #[default]
    Low,
    /// 30 % up to 60 %
    Moderate,
    /// 60 % up to 80 %
    High,
    /// 80 % and above
    #[serde(alias = "veryHigh")]
    VeryHigh,
}

impl OccupancyBand {
    /// Every band, emptiest first
    pub const ALL: [OccupancyBand; 4] =
        [OccupancyBand::Low, OccupancyBand::Moderate, OccupancyBand::High, OccupancyBand::VeryHigh];

    /// Band for an occupancy percentage, clamped to `[0, 100]`
    ///
    /// # Examples
    /// ```
    /// use app_core::conditions::OccupancyBand;
    ///
    /// assert_eq!(OccupancyBand::from_percentage(29.0), OccupancyBand::Low);
    /// assert_eq!(OccupancyBand::from_percentage(30.0), OccupancyBand::Moderate);
    /// assert_eq!(OccupancyBand::from_percentage(80.0), OccupancyBand::VeryHigh);
    /// ```
    pub fn from_percentage(percentage: f64) -> Self {
        let p = clamp_percent(percentage);
        if p < 30.0 {
            OccupancyBand::Low
        } else if p < 60.0 {
            OccupancyBand::Moderate
        } else if p < 80.0 {
            OccupancyBand::High
        } else {
            OccupancyBand::VeryHigh
        }
    }

    /// Wire name, also the translation key
    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyBand::Low => "low",
            OccupancyBand::Moderate => "moderate",
            OccupancyBand::High => "high",
            OccupancyBand::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for OccupancyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccupancyBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(OccupancyBand::Low),
            "moderate" => Ok(OccupancyBand::Moderate),
            "high" => Ok(OccupancyBand::High),
            "very_high" | "veryHigh" => Ok(OccupancyBand::VeryHigh),
            other => Err(format!("Unknown occupancy status: {}", other)),
        }
    }
}

// =============================================================================
// Water quality
// =============================================================================

/// Water quality tier for a 0–100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// 80 and above
    Excellent,
    /// 60 up to 80
    Good,
    /// 40 up to 60
    Fair,
    /// Below 40
    Poor,
}

impl QualityTier {
    /// Tier for a quality score
    pub fn from_score(score: f64) -> Self {
        let s = clamp_percent(score);
        if s >= 80.0 {
            QualityTier::Excellent
        } else if s >= 60.0 {
            QualityTier::Good
        } else if s >= 40.0 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }

    /// Translation key
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
        }
    }
}

/// Number of filled stars (out of five) for a quality score
///
/// `round(score / 100 * 5)`, halves rounding up, clamped to `[0, 5]`.
pub fn water_quality_stars(score: f64) -> u8 {
    (clamp_percent(score) / 100.0 * 5.0).round() as u8
}

/// Water clarity as reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterClarity {
    /// Excellent
    Excellent,
    /// Good
    #[default]
    Good,
    /// Fair
    Fair,
    /// Poor
    Poor,
}

impl WaterClarity {
    /// Width of the clarity bar, in percent
    pub fn fill_percent(&self) -> u8 {
        match self {
            WaterClarity::Excellent => 100,
            WaterClarity::Good => 75,
            WaterClarity::Fair => 50,
            WaterClarity::Poor => 25,
        }
    }

    /// Wire name, also the translation key
    pub fn as_str(&self) -> &'static str {
        match self {
            WaterClarity::Excellent => "excellent",
            WaterClarity::Good => "good",
            WaterClarity::Fair => "fair",
            WaterClarity::Poor => "poor",
        }
    }
}

impl FromStr for WaterClarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(WaterClarity::Excellent),
            "good" => Ok(WaterClarity::Good),
            "fair" => Ok(WaterClarity::Fair),
            "poor" => Ok(WaterClarity::Poor),
            other => Err(format!("Unknown water clarity: {}", other)),
        }
    }
}

// =============================================================================
// Weather
// =============================================================================

/// Sky conditions; unrecognized tags are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCondition {
    /// Clear sky
    #[default]
    Sunny,
    /// Some clouds
    PartlyCloudy,
    /// Overcast
    Cloudy,
    /// Rain
    Rainy,
    /// Anything else the backend reports
    Other(String),
}

impl WeatherCondition {
    /// Wire name
    pub fn as_str(&self) -> &str {
        match self {
            WeatherCondition::Sunny => "sunny",
            WeatherCondition::PartlyCloudy => "partly_cloudy",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::Rainy => "rainy",
            WeatherCondition::Other(tag) => tag,
        }
    }
}

impl From<String> for WeatherCondition {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "sunny" => WeatherCondition::Sunny,
            "partly_cloudy" => WeatherCondition::PartlyCloudy,
            "cloudy" => WeatherCondition::Cloudy,
            "rainy" => WeatherCondition::Rainy,
            _ => WeatherCondition::Other(tag),
        }
    }
}

impl From<WeatherCondition> for String {
    fn from(condition: WeatherCondition) -> Self {
        condition.as_str().to_string()
    }
}

// =============================================================================
// Conditions row
// =============================================================================

/// One `beach_conditions` row (or the subset embedded under a beach)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeachConditions {
    /// Row id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Beach the reading belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beach_id: Option<Uuid>,
    /// Occupancy percentage
    pub occupancy_level: Option<f64>,
    /// Reported occupancy status
    #[serde(deserialize_with = "lenient")]
    pub occupancy_status: Option<OccupancyBand>,
    /// Water temperature in °C
    pub water_temperature: Option<f64>,
    /// Water clarity
    #[serde(deserialize_with = "lenient")]
    pub water_clarity: Option<WaterClarity>,
    /// Water quality score, 0–100
    pub water_quality_score: Option<f64>,
    /// Sky conditions
    pub weather_condition: Option<WeatherCondition>,
    /// Air temperature in °C
    pub air_temperature: Option<f64>,
    /// Wind speed in km/h
    pub wind_speed: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// UV index
    pub uv_index: Option<f64>,
    /// Time of the reading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parse a known tag, treating unknown tags as missing
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|tag| match tag.parse() {
        Ok(value) => Some(value),
        Err(reason) => {
            tracing::debug!(%reason, "ignoring unknown tag");
            None
        }
    }))
}

/// Display-ready view of a conditions row, with fallbacks applied
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionsReadout {
    /// Occupancy percentage, clamped to `[0, 100]`
    pub occupancy_percent: u8,
    /// Band derived from the percentage (drives colors)
    pub occupancy_band: OccupancyBand,
    /// Reported status (drives the badge label and filtering)
    pub occupancy_status: OccupancyBand,
    /// Water quality score, clamped to `[0, 100]`
    pub quality_score: u8,
    /// Tier derived from the score
    pub quality_tier: QualityTier,
    /// Filled stars out of five
    pub quality_stars: u8,
    /// Water clarity
    pub water_clarity: WaterClarity,
    /// Water temperature in °C
    pub water_temperature: f64,
    /// Air temperature in °C
    pub air_temperature: f64,
    /// Sky conditions
    pub weather: WeatherCondition,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Relative humidity
    pub humidity: f64,
    /// UV index
    pub uv_index: f64,
}

impl BeachConditions {
    /// Derive the display fields, using zero / `low` / `good` / `sunny` for missing values
    pub fn readout(&self) -> ConditionsReadout {
        let occupancy = self.occupancy_level.unwrap_or(0.0);
        let score = self.water_quality_score.unwrap_or(0.0);

        ConditionsReadout {
            occupancy_percent: clamp_percent(occupancy).round() as u8,
            occupancy_band: OccupancyBand::from_percentage(occupancy),
            occupancy_status: self.occupancy_status.unwrap_or_default(),
            quality_score: clamp_percent(score).round() as u8,
            quality_tier: QualityTier::from_score(score),
            quality_stars: water_quality_stars(score),
            water_clarity: self.water_clarity.unwrap_or_default(),
            water_temperature: self.water_temperature.unwrap_or(0.0),
            air_temperature: self.air_temperature.unwrap_or(0.0),
            weather: self.weather_condition.clone().unwrap_or_default(),
            wind_speed: self.wind_speed.unwrap_or(0.0),
            humidity: self.humidity.unwrap_or(0.0),
            uv_index: self.uv_index.unwrap_or(0.0),
        }
    }

    /// Readout for the home hero card
    ///
    /// Air temperature, water temperature and UV index fall back to the home
    /// card defaults when missing or zero.
    pub fn home_readout(&self) -> ConditionsReadout {
        let nonzero_or = |value: Option<f64>, fallback: f64| value.filter(|v| *v != 0.0).unwrap_or(fallback);

        ConditionsReadout {
            air_temperature: nonzero_or(self.air_temperature, HOME_AIR_TEMPERATURE),
            water_temperature: nonzero_or(self.water_temperature, HOME_WATER_TEMPERATURE),
            uv_index: nonzero_or(self.uv_index, HOME_UV_INDEX),
            ..self.readout()
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
