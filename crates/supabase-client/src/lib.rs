//! Backend client library for Solymar
//!
//! This crate talks to the hosted backend-as-a-service: the PostgREST table
//! API (`rest`), the auth API (`auth`), and local persistence of the signed-in
//! session (`session`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod rest;
pub mod session;

pub use auth::{AuthClient, AuthError, OAuthProvider, Session, SignUpOutcome, User};
pub use client::SupabaseClient;
pub use rest::{ClientConfig, ConfigError, RestClient, RestError, RestRequest, RestResponse};
pub use session::{FileSessionStorage, MemorySessionStorage, SessionStorage};

/// Result type for client construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or using the backend clients
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Table API error
    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    /// Auth API error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session persistence error
    #[error("Session storage error: {0}")]
    Storage(#[from] storage::PersistenceError),
}
