//! Storage layer for Solymar
//!
//! The backend owns every entity, so the client only keeps two kinds of local
//! state: an in-memory cache for query results and a small persisted file for
//! the auth session.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod persistence;

pub use cache::{CacheConfig, CacheError, MemoryCache};
pub use persistence::{PersistedState, PersistenceConfig, PersistenceError};
