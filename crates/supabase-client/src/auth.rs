//! Auth client
//!
//! Thin wrapper over the backend's `/auth/v1` endpoints: e-mail/password
//! sign-in, sign-up, sign-out, token refresh, user lookup and the OAuth
//! authorize URL. Token issuance and validation stay on the server; this
//! module only moves tokens around.
//!
//! # Example
//!
//! ```rust,no_run
//! use supabase_client::auth::AuthClient;
//! use supabase_client::rest::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthClient::new(ClientConfig::new("https://demo.supabase.co", "anon-key"))?;
//!     let session = auth.sign_in_with_password("ana@example.com", "secret").await?;
//!     println!("Signed in as: {}", session.user.id);
//!     Ok(())
//! }
//! ```

use crate::rest::{header_map, ClientConfig};
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during auth operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Backend rejected the request
    #[error("Auth error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error code, when the backend sends one
        code: Option<String>,
        /// Error message
        message: String,
    },

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),
}

impl AuthError {
    /// Wrong e-mail/password or an unusable token
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AuthError::Api { status: 400 | 401, .. })
    }
}

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id (also the `profiles.id`)
    pub id: Uuid,
    /// E-mail address
    #[serde(default)]
    pub email: Option<String>,
    /// Account creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Free-form metadata set at sign-up
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Username from sign-up metadata, if any
    pub fn metadata_username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(|v| v.as_str())
    }

    /// Local part of the e-mail address
    pub fn email_local_part(&self) -> Option<&str> {
        self.email.as_deref().and_then(|e| e.split('@').next()).filter(|s| !s.is_empty())
    }
}

/// Token pair plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for table requests
    pub access_token: String,
    /// Token type, normally "bearer"
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Expiry as a Unix timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Token used to obtain a new access token
    pub refresh_token: String,
    /// Signed-in user
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Expiry time, derived from `expires_at` or `expires_in`
    pub fn expiry(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.expires_in) {
            (Some(at), _) => DateTime::from_timestamp(at, 0),
            (None, Some(secs)) => Some(issued_at + chrono::Duration::seconds(secs)),
            (None, None) => None,
        }
    }

    /// Whether the access token has expired at `now`
    ///
    /// Sessions without any expiry information are treated as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at.and_then(|at| DateTime::from_timestamp(at, 0)) {
            Some(at) => at <= now,
            None => true,
        }
    }

    /// Fill `expires_at` from `expires_in` when the server sent only the latter
    pub fn stamp_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expiry(now).map(|t| t.timestamp());
        }
        self
    }
}

/// Outcome of a sign-up
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn(Session),
    /// Account created, e-mail confirmation pending
    ConfirmationPending(User),
}

/// OAuth identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    /// Google
    Google,
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthProvider::Google => write!(f, "google"),
        }
    }
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Sign-up responses are either a full session or a bare user
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(User),
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the auth endpoints
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: ReqwestClient,
    config: ClientConfig,
}

impl AuthClient {
    /// Create a new auth client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_http().map_err(|e| AuthError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Sign in with e-mail and password
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/token?grant_type=password", self.config.auth_url());
        let request = self.client.post(&url).json(&PasswordCredentials { email, password });

        let session: Session = self.send_json(request).await?;
        tracing::debug!(user = %session.user.id, "password sign-in succeeded");
        Ok(session.stamp_expiry(Utc::now()))
    }

    /// Create an account; `username` travels as user metadata for the profile row
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<SignUpOutcome> {
        let url = format!("{}/signup", self.config.auth_url());
        let body = SignUpRequest {
            email,
            password,
            data: serde_json::json!({ "username": username }),
        };
        let request = self.client.post(&url).json(&body);

        match self.send_json::<SignUpResponse>(request).await? {
            SignUpResponse::Session(session) => Ok(SignUpOutcome::SignedIn(session.stamp_expiry(Utc::now()))),
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationPending(user)),
        }
    }

    /// Exchange a refresh token for a new session
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = format!("{}/token?grant_type=refresh_token", self.config.auth_url());
        let request = self.client.post(&url).json(&RefreshRequest { refresh_token });

        let session: Session = self.send_json(request).await?;
        Ok(session.stamp_expiry(Utc::now()))
    }

    /// Fetch the user an access token belongs to
    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        let url = format!("{}/user", self.config.auth_url());
        let request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token));
        self.send_json(request).await
    }

    /// Revoke the session server-side
    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = format!("{}/logout", self.config.auth_url());
        let request = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token));
        self.send(request).await.map(|_| ())
    }

    /// URL the user agent must open to start an OAuth sign-in
    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> String {
        let mut url = format!("{}/authorize?provider={}", self.config.auth_url(), provider);
        if let Some(redirect) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }
        url
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let mut request = request.header("apikey", &self.config.anon_key);
        for (key, value) in &self.config.default_headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let headers = header_map(&response);
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status, request_id = ?headers.get("x-request-id"), "auth request rejected");

        Err(match serde_json::from_str::<AuthErrorBody>(&body) {
            Ok(parsed) => AuthError::Api {
                status,
                code: parsed.error_code.or(parsed.error),
                message: parsed
                    .error_description
                    .or(parsed.msg)
                    .or(parsed.message)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            },
            Err(_) => AuthError::Api { status, code: None, message: format!("HTTP {}: {}", status, body) },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Parse(format!("Failed to read response: {}", e)))?;
        serde_json::from_str(&body).map_err(|e| AuthError::Parse(format!("Failed to parse JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": "6f1c2d3e-4b5a-4c7d-8e9f-0a1b2c3d4e5f",
            "email": "ana@example.com",
            "created_at": "2024-05-01T10:00:00Z",
            "user_metadata": {"username": "ana"}
        })
    }

    #[test]
    fn test_user_helpers() {
        let user: User = serde_json::from_value(user_json()).unwrap();
        assert_eq!(user.metadata_username(), Some("ana"));
        assert_eq!(user.email_local_part(), Some("ana"));

        let bare: User = serde_json::from_value(serde_json::json!({
            "id": "6f1c2d3e-4b5a-4c7d-8e9f-0a1b2c3d4e5f"
        }))
        .unwrap();
        assert_eq!(bare.metadata_username(), None);
        assert_eq!(bare.email_local_part(), None);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session: Session = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "user": user_json()
        }))
        .unwrap();

        assert_eq!(session.token_type, "bearer");
        assert!(session.is_expired_at(now), "no expires_at means expired");

        let stamped = session.stamp_expiry(now);
        assert!(!stamped.is_expired_at(now));
        assert!(stamped.is_expired_at(now + chrono::Duration::seconds(3601)));
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let session: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_at": 1_900_000_000,
            "user": user_json()
        }))
        .unwrap();
        assert!(matches!(session, SignUpResponse::Session(_)));

        let user: SignUpResponse = serde_json::from_value(user_json()).unwrap();
        assert!(matches!(user, SignUpResponse::User(_)));
    }

    #[test]
    fn test_authorize_url() {
        let auth = AuthClient::new(ClientConfig::new("https://demo.supabase.co", "anon")).unwrap();
        assert_eq!(
            auth.authorize_url(OAuthProvider::Google, None),
            "https://demo.supabase.co/auth/v1/authorize?provider=google"
        );
        assert_eq!(
            auth.authorize_url(OAuthProvider::Google, Some("https://app.example/cb?x=1")),
            "https://demo.supabase.co/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fapp.example%2Fcb%3Fx%3D1"
        );
    }

    #[test]
    fn test_invalid_credentials() {
        let err = AuthError::Api { status: 400, code: Some("invalid_grant".into()), message: "Invalid login credentials".into() };
        assert!(err.is_invalid_credentials());
        assert!(!AuthError::Network("down".into()).is_invalid_credentials());
    }
}
