//! HTTP plumbing shared by the three AI function clients
//!
//! Every function is a JSON POST to `<base_url>/<function>` carrying the
//! static API key both as an `apikey` header and as a bearer token. Non-2xx
//! replies carry `{ "error": "..." }`; that text is what users see.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("techno-remix/", env!("CARGO_PKG_VERSION"));

/// Message used when a 429 reply carries no error text
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Function name of the analysis endpoint
pub const ANALYZE_AUDIO: &str = "analyze-audio";
/// Function name of the match endpoint
pub const FIND_MATCHES: &str = "find-matches";
/// Function name of the remix endpoint
pub const GENERATE_REMIX: &str = "generate-remix";

/// Failure talking to an AI function
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Transport-level failure (connect, timeout, broken body)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429
    #[error("{0}")]
    RateLimited(String),

    /// Any other non-2xx status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Body could not be decoded or lacks required fields
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_))
    }
}

/// Connection settings for the AI functions
#[derive(Debug, Clone)]
pub struct FunctionsConfig {
    /// Base URL, e.g. "https://project.example.co/functions/v1"
    pub base_url: String,
    /// Static API key
    pub api_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl FunctionsConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(remix_common::config::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the AI functions
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct FunctionsClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FunctionsClient {
    /// Create new functions client
    pub fn new(config: &FunctionsConfig) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Full URL of a function
    pub fn function_url(&self, function: &str) -> String {
        format!("{}/{}", self.base_url, function)
    }

    /// POST `body` to `function` and decode the JSON reply
    ///
    /// Each call builds its own request; nothing is shared between calls
    /// except the connection pool.
    pub async fn invoke<B, T>(&self, function: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.function_url(function);
        debug!(function = %function, url = %url, "Invoking AI function");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        if !status.is_success() {
            let error = error_from_status(status.as_u16(), &text);
            warn!(function = %function, status = status.as_u16(), error = %error, "AI function failed");
            return Err(error);
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(function = %function, error = %e, "AI function returned malformed JSON");
            ServiceError::MalformedResponse(format!("{} returned invalid JSON: {}", function, e))
        })
    }
}

/// Map a non-2xx status and body to a [`ServiceError`]
///
/// The `{ "error": ... }` text is kept verbatim when present.
pub fn error_from_status(status: u16, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());

    if status == 429 {
        return ServiceError::RateLimited(message.unwrap_or_else(|| RATE_LIMIT_MESSAGE.to_string()));
    }

    ServiceError::Status {
        status,
        message: message.unwrap_or_else(|| format!("Request failed with status {}", status)),
    }
}
