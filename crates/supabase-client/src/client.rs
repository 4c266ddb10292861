//! Combined backend client
//!
//! [`SupabaseClient`] bundles the table and auth clients built from one
//! [`ClientConfig`] and keeps the table client's bearer token in step with
//! the current session.

use crate::auth::{AuthClient, Session};
use crate::rest::{ClientConfig, RestClient};
use crate::Result;

/// Table and auth clients for one project
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    rest: RestClient,
    auth: AuthClient,
}

impl SupabaseClient {
    /// Build both clients from one config
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config.clone())?,
            auth: AuthClient::new(config)?,
        })
    }

    /// Table client
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Auth client
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Authorize table requests as the session's user
    pub async fn adopt_session(&self, session: &Session) {
        self.rest.set_access_token(Some(session.access_token.clone())).await;
    }

    /// Go back to anonymous table requests
    pub async fn drop_session(&self) {
        self.rest.set_access_token(None).await;
    }
}
