//! PostgREST client implementation
//!
//! This module implements the row-level table interface exposed by the
//! backend under `/rest/v1`. It provides a request builder that encodes
//! column filters the way PostgREST expects them (`column=eq.value`), the
//! response and error types, and the HTTP executor.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

// =============================================================================
// Error Types
// =============================================================================

/// Error returned by a table request
///
/// Covers both transport failures (status `0`) and errors reported by the
/// backend, which carry the PostgreSQL/PostgREST error code.
///
/// # Examples
/// ```
/// use supabase_client::rest::RestError;
///
/// let error = RestError::new(409, "23505", "duplicate key value violates unique constraint");
/// assert!(error.is_conflict());
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestError {
    status: u16,
    code: String,
    message: String,
    details: Option<String>,
}

impl RestError {
    /// Create a new error
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach backend-provided details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status code (`0` for transport failures)
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Error code (PostgreSQL SQLSTATE, PostgREST `PGRST...` or a local code)
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Additional details, if the backend sent any
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// The request never produced an HTTP response
    pub fn is_network_error(&self) -> bool {
        self.status == 0 && self.code == "NetworkError"
    }

    /// Unique-constraint violation
    pub fn is_conflict(&self) -> bool {
        self.status == 409 || self.code == "23505"
    }

    /// Missing or rejected credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, 401 | 403)
    }

    /// A single-object read matched no rows
    pub fn is_no_rows(&self) -> bool {
        self.code == "PGRST116"
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REST error {}: {} - {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for RestError {}

/// Error body returned by PostgREST
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgrestErrorBody {
    /// SQLSTATE or PGRST code
    pub code: Option<String>,
    /// Error message
    pub message: String,
    /// Details
    pub details: Option<String>,
    /// Hint
    pub hint: Option<String>,
}

/// Configuration could not be built
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable missing
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    /// Environment variable present but unusable
    #[error("Invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// What was wrong
        reason: String,
    },
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for table requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Row read
    Get,
    /// Row count without body
    Head,
    /// Row insert
    Post,
    /// Partial row update
    Patch,
    /// Row delete
    Delete,
}

impl HttpMethod {
    /// Method name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Media type asking PostgREST for a single object instead of an array
pub const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// A request against one table
///
/// # Examples
/// ```
/// use supabase_client::rest::RestRequest;
///
/// let request = RestRequest::select("user_favorite_beaches", "beach_id")
///     .eq("user_id", "8d0c...")
///     .limit(10);
///
/// let pairs = request.query_pairs();
/// assert!(pairs.contains(&("select".to_string(), "beach_id".to_string())));
/// assert!(pairs.contains(&("user_id".to_string(), "eq.8d0c...".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Table name
    pub table: String,
    /// Column selection, including embedded resources
    pub select: Option<String>,
    /// Filters as (column, operator expression)
    pub filters: Vec<(String, String)>,
    /// Ordering expression
    pub order: Option<String>,
    /// Row limit
    pub limit: Option<usize>,
    /// `Prefer` header values
    pub prefer: Vec<String>,
    /// Extra headers
    pub headers: HashMap<String, String>,
    /// JSON body
    pub body: Option<Vec<u8>>,
    /// Expect exactly one row back
    pub single: bool,
}

impl RestRequest {
    fn new(method: HttpMethod, table: impl Into<String>) -> Self {
        Self {
            method,
            table: table.into(),
            select: None,
            filters: Vec::new(),
            order: None,
            limit: None,
            prefer: Vec::new(),
            headers: HashMap::new(),
            body: None,
            single: false,
        }
    }

    /// Read rows with the given column selection
    pub fn select(table: impl Into<String>, columns: impl Into<String>) -> Self {
        let mut request = Self::new(HttpMethod::Get, table);
        request.select = Some(columns.into());
        request
    }

    /// Insert one row
    pub fn insert<T: Serialize>(table: impl Into<String>, row: &T) -> Result<Self, serde_json::Error> {
        let mut request = Self::new(HttpMethod::Post, table).prefer("return=minimal");
        request.body = Some(serde_json::to_vec(row)?);
        Ok(request)
    }

    /// Partially update the rows matched by the filters
    pub fn update<T: Serialize>(table: impl Into<String>, patch: &T) -> Result<Self, serde_json::Error> {
        let mut request = Self::new(HttpMethod::Patch, table).prefer("return=minimal");
        request.body = Some(serde_json::to_vec(patch)?);
        Ok(request)
    }

    /// Delete the rows matched by the filters
    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, table)
    }

    /// Count the rows matched by the filters without fetching them
    pub fn count(table: impl Into<String>) -> Self {
        let mut request = Self::new(HttpMethod::Head, table).prefer("count=exact");
        request.select = Some("*".to_string());
        request
    }

    /// Filter on column equality
    pub fn eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters.push((column.into(), format!("eq.{}", value)));
        self
    }

    /// Order by a column
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{}.{}", column, direction));
        self
    }

    /// Limit the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Expect a single object back
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Add a `Prefer` value
    pub fn prefer(mut self, value: impl Into<String>) -> Self {
        self.prefer.push(value.into());
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Query string pairs in the order they are sent
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }
        pairs.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            pairs.push(("order".to_string(), order.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from a table request
#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercase names)
    pub headers: HashMap<String, String>,
    /// Response data
    pub data: T,
}

impl<T> RestResponse<T> {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, data: T) -> Self {
        Self { status, headers, data }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_ascii_lowercase())
    }

    /// Total row count from `Content-Range`, if present
    pub fn total_count(&self) -> Option<u64> {
        self.header("content-range").and_then(|v| parse_content_range_total(v))
    }
}

/// Parse the total out of a `Content-Range` value (`0-24/57`, `*/0`)
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Environment variable holding the project URL
pub const ENV_URL: &str = "SOLYMAR_SUPABASE_URL";
/// Environment variable holding the public anon key
pub const ENV_ANON_KEY: &str = "SOLYMAR_SUPABASE_ANON_KEY";
/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT: &str = "SOLYMAR_HTTP_TIMEOUT_SECS";

/// Connection settings shared by the table and auth clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project URL (e.g., "https://xyzcompany.supabase.co")
    pub project_url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers included in all requests
    pub default_headers: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a config for a project
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Solymar/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }

    /// Read the config from `SOLYMAR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL).ok_or(ConfigError::Missing(ENV_URL))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: ENV_URL,
                reason: format!("expected an http(s) URL, got {:?}", url),
            });
        }
        let key = lookup(ENV_ANON_KEY).ok_or(ConfigError::Missing(ENV_ANON_KEY))?;

        let mut config = Self::new(url, key);
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                var: ENV_TIMEOUT,
                reason: format!("not a number of seconds: {:?}", raw),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Base URL of the table API
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.project_url)
    }

    /// Base URL of the auth API
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.project_url)
    }

    pub(crate) fn build_http(&self) -> reqwest::Result<ReqwestClient> {
        ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
    }
}

pub(crate) fn header_map(response: &ReqwestResponse) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (key, value) in response.headers() {
        if let Ok(value_str) = value.to_str() {
            headers.insert(key.as_str().to_string(), value_str.to_string());
        }
    }
    headers
}

// =============================================================================
// Client Implementation
// =============================================================================

/// Client for the table API
///
/// Requests are authorized with the signed-in user's access token once one is
/// set, and with the anon key otherwise.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: ReqwestClient,
    config: ClientConfig,
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestClient {
    /// Create a new table client
    pub fn new(config: ClientConfig) -> Result<Self, RestError> {
        let client = config
            .build_http()
            .map_err(|e| RestError::new(0, "ClientBuild", e.to_string()))?;

        Ok(Self {
            client,
            config,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Use a user's access token for subsequent requests (`None` reverts to the anon key)
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Whether a user token is currently set
    pub async fn has_access_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    /// Read rows and deserialize them
    pub async fn fetch<T: DeserializeOwned>(&self, request: RestRequest) -> Result<RestResponse<T>, RestError> {
        let response = self.send(&request).await?;
        let status = response.status().as_u16();
        let headers = header_map(&response);

        let body = response
            .text()
            .await
            .map_err(|e| RestError::new(0, "ParseError", format!("Failed to read response: {}", e)))?;

        let data: T = serde_json::from_str(&body)
            .map_err(|e| RestError::new(0, "ParseError", format!("Failed to parse JSON: {}", e)))?;

        Ok(RestResponse::new(status, headers, data))
    }

    /// Run a write (insert, update, delete) and discard the body
    pub async fn execute(&self, request: RestRequest) -> Result<RestResponse<()>, RestError> {
        let response = self.send(&request).await?;
        Ok(RestResponse::new(response.status().as_u16(), header_map(&response), ()))
    }

    /// Count rows matched by a [`RestRequest::count`] request
    pub async fn count(&self, request: RestRequest) -> Result<u64, RestError> {
        let response = self.execute(request).await?;
        response.total_count().ok_or_else(|| {
            RestError::new(0, "ParseError", "Missing or malformed Content-Range header")
        })
    }

    async fn send(&self, request: &RestRequest) -> Result<ReqwestResponse, RestError> {
        let url = format!("{}/{}", self.config.rest_url(), request.table);
        tracing::debug!(method = request.method.as_str(), table = %request.table, "rest request");

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Head => self.client.head(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Patch => self.client.patch(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        req = req.query(&request.query_pairs()).headers(self.auth_headers().await?);

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }
        if !request.prefer.is_empty() {
            req = req.header("Prefer", request.prefer.join(","));
        }
        if request.single {
            req = req.header(ACCEPT, SINGLE_OBJECT);
        }
        if let Some(body) = &request.body {
            req = req.header(CONTENT_TYPE, "application/json").body(body.clone());
        }

        let response = req
            .send()
            .await
            .map_err(|e| RestError::new(0, "NetworkError", format!("Request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<PostgrestErrorBody>(&body) {
            Ok(parsed) => {
                let error = RestError::new(status, parsed.code.unwrap_or_default(), parsed.message);
                match parsed.details {
                    Some(details) => error.with_details(details),
                    None => error,
                }
            }
            Err(_) => RestError::new(status, "Unknown", format!("HTTP {}: {}", status, body)),
        })
    }

    async fn auth_headers(&self) -> Result<HeaderMap, RestError> {
        let token = self.access_token.read().await;
        let bearer = token.as_deref().unwrap_or(&self.config.anon_key);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.config.anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);
        Ok(headers)
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn header_value(value: &str) -> Result<HeaderValue, RestError> {
    HeaderValue::from_str(value).map_err(|e| RestError::new(0, "InvalidHeader", e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
