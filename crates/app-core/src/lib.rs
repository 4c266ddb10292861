//! Core application logic for Solymar
//!
//! This crate contains the beach domain: conditions and their derived
//! presentation fields, the beach directory, favorites, profiles, and the
//! Explore content. Backend access sits behind small traits implemented for
//! the table client so each service can be tested against mocks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod beaches;
pub mod conditions;
pub mod explore;
pub mod favorites;
pub mod profiles;

pub use beaches::{
    filter_beaches, Beach, BeachDirectory, BeachWithConditions, BeachesWithConditionsQuery,
    FeaturedConditions, FeaturedConditionsQuery, OccupancyFilter,
};
pub use conditions::{
    BeachConditions, ConditionsReadout, OccupancyBand, QualityTier, WaterClarity, WeatherCondition,
};
pub use explore::{Accent, CardIcon, ExploreCard};
pub use favorites::{
    FavoriteBeach, FavoriteBeachesQuery, FavoriteChange, FavoriteError, FavoriteIdsQuery,
    FavoritesBackend, FavoritesService,
};
pub use profiles::{
    display_name, member_since, ProfileError, ProfileQuery, ProfileService, ProfileStats,
    ProfileStatsQuery, ProfileUpdate, ProfilesBackend, UserProfile,
};
