//! Application state management for Solymar
//!
//! This crate provides the query/mutation cache, the session gate deciding
//! between the auth screen and the tab shell, and the UI preference store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mutation;
pub mod preferences;
pub mod query;
pub mod session;

pub use mutation::{Mutation, MutationClient, MutationConfig, MutationError, MutationState};
pub use preferences::{ColorMode, PreferenceStore, UiPreferences};
pub use query::{Query, QueryClient, QueryConfig, QueryError, QueryKey, QueryState};
pub use session::{GateState, SessionGate, SessionStateError};
