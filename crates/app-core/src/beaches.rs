//! Beaches and their latest conditions
//!
//! This module provides the beach directory queries used by the Home and
//! Beaches tabs, plus the client-side search and occupancy filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use supabase_client::rest::{RestClient, RestError, RestRequest, RestResponse};
use uuid::Uuid;

use crate::conditions::{BeachConditions, OccupancyBand};
use app_state::query::{Query, QueryKey, Result as QueryResult};

#[cfg(test)]
use mockall::automock;

/// Beaches table
pub const BEACHES_TABLE: &str = "beaches";
/// Conditions table
pub const CONDITIONS_TABLE: &str = "beach_conditions";

/// Query scope of the beach list
pub const BEACHES_WITH_CONDITIONS: &str = "beaches-with-conditions";
/// Query scope of the featured reading
pub const BEACH_CONDITIONS: &str = "beach-conditions";

/// Conditions columns embedded under each beach
pub const CONDITION_COLUMNS: &str = "occupancy_level,occupancy_status,water_temperature,water_clarity,water_quality_score,weather_condition,air_temperature";

/// Name shown when the featured reading has no beach attached
pub const FALLBACK_BEACH_NAME: &str = "Playa Principal";
/// Location shown when the featured reading has no beach attached
pub const FALLBACK_LOCATION: &str = "Ubicación";

/// A beach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beach {
    /// Beach id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Town or region
    pub location: String,
    /// Longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Hero image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A beach with its embedded conditions rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeachWithConditions {
    /// The beach
    #[serde(flatten)]
    pub beach: Beach,
    /// Conditions readings, most relevant first
    #[serde(default)]
    pub beach_conditions: Vec<BeachConditions>,
}

impl BeachWithConditions {
    /// The reading shown for the beach
    pub fn conditions(&self) -> Option<&BeachConditions> {
        self.beach_conditions.first()
    }

    /// Case-insensitive match on name or location; an empty term matches everything
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.beach.name.to_lowercase().contains(&term)
            || self.beach.location.to_lowercase().contains(&term)
    }

    /// Whether the reported status passes the filter
    pub fn matches_filter(&self, filter: OccupancyFilter) -> bool {
        match filter.band() {
            None => true,
            Some(band) => self.conditions().and_then(|c| c.occupancy_status) == Some(band),
        }
    }
}

/// Occupancy filter chips on the Beaches tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyFilter {
    /// No filtering
    #[default]
    All,
    /// Status `low`
    Low,
    /// Status `moderate`
    Moderate,
    /// Status `high`
    High,
}

impl OccupancyFilter {
    /// Chips in display order
    pub const ALL: [OccupancyFilter; 4] =
        [OccupancyFilter::All, OccupancyFilter::Low, OccupancyFilter::Moderate, OccupancyFilter::High];

    /// Chip id, also the translation key of its label
    pub fn id(&self) -> &'static str {
        match self {
            OccupancyFilter::All => "all",
            OccupancyFilter::Low => "low",
            OccupancyFilter::Moderate => "moderate",
            OccupancyFilter::High => "high",
        }
    }

    /// Chip for an id; unknown ids select everything
    pub fn from_id(id: &str) -> Self {
        Self::ALL.into_iter().find(|f| f.id() == id).unwrap_or_default()
    }

    /// Status the filter selects, `None` for all
    pub fn band(&self) -> Option<OccupancyBand> {
        match self {
            OccupancyFilter::All => None,
            OccupancyFilter::Low => Some(OccupancyBand::Low),
            OccupancyFilter::Moderate => Some(OccupancyBand::Moderate),
            OccupancyFilter::High => Some(OccupancyBand::High),
        }
    }
}

/// Apply the search term and filter, keeping the original order
pub fn filter_beaches<'a>(
    beaches: &'a [BeachWithConditions],
    term: &str,
    filter: OccupancyFilter,
) -> Vec<&'a BeachWithConditions> {
    beaches
        .iter()
        .filter(|b| b.matches_search(term) && b.matches_filter(filter))
        .collect()
}

/// Name and location embedded under a conditions row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeachSummary {
    /// Display name
    pub name: String,
    /// Town or region
    pub location: String,
}

/// The reading featured on the Home tab
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeaturedConditions {
    /// The reading
    #[serde(flatten)]
    pub conditions: BeachConditions,
    /// Beach the reading belongs to
    #[serde(default)]
    pub beaches: Option<BeachSummary>,
}

impl FeaturedConditions {
    /// Beach name, or the fallback
    pub fn beach_name(&self) -> &str {
        self.beaches.as_ref().map(|b| b.name.as_str()).unwrap_or(FALLBACK_BEACH_NAME)
    }

    /// Beach location, or the fallback
    pub fn location(&self) -> &str {
        self.beaches.as_ref().map(|b| b.location.as_str()).unwrap_or(FALLBACK_LOCATION)
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Read access to beaches and conditions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BeachDirectory: Send + Sync {
    /// Every beach with its embedded conditions
    async fn beaches_with_conditions(&self) -> Result<Vec<BeachWithConditions>, RestError>;

    /// The first conditions row with its beach; `None` when there are no readings
    async fn featured_conditions(&self) -> Result<Option<FeaturedConditions>, RestError>;
}

#[async_trait]
impl BeachDirectory for RestClient {
    async fn beaches_with_conditions(&self) -> Result<Vec<BeachWithConditions>, RestError> {
        let request = RestRequest::select(BEACHES_TABLE, format!("*,{}({})", CONDITIONS_TABLE, CONDITION_COLUMNS));
        let response: RestResponse<Vec<BeachWithConditions>> = self.fetch(request).await?;
        Ok(response.data)
    }

    async fn featured_conditions(&self) -> Result<Option<FeaturedConditions>, RestError> {
        let request = RestRequest::select(CONDITIONS_TABLE, "*,beaches:beach_id(name,location)")
            .limit(1)
            .single();

        match self.fetch::<FeaturedConditions>(request).await {
            Ok(response) => Ok(Some(response.data)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// All beaches with their conditions
#[derive(Clone)]
pub struct BeachesWithConditionsQuery {
    directory: Arc<dyn BeachDirectory>,
}

impl BeachesWithConditionsQuery {
    /// Create the query
    pub fn new(directory: Arc<dyn BeachDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Query for BeachesWithConditionsQuery {
    type Data = Vec<BeachWithConditions>;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        Ok(self.directory.beaches_with_conditions().await?)
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(BEACHES_WITH_CONDITIONS, "all")
    }
}

/// The featured reading for the Home tab
#[derive(Clone)]
pub struct FeaturedConditionsQuery {
    directory: Arc<dyn BeachDirectory>,
}

impl FeaturedConditionsQuery {
    /// Create the query
    pub fn new(directory: Arc<dyn BeachDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Query for FeaturedConditionsQuery {
    type Data = Option<FeaturedConditions>;

    async fn fetch(&self) -> QueryResult<Self::Data> {
        Ok(self.directory.featured_conditions().await?)
    }

    fn key(&self) -> QueryKey {
        QueryKey::new(BEACH_CONDITIONS, "featured")
    }
}
