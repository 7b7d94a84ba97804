//! Configuration for the cohort-query client.
//!
//! All settings are read from the environment once at construction and are
//! immutable for the lifetime of the client. Missing or empty required values
//! are a fatal construction-time error, not a per-call fault.

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Environment variable names.
const ENV_API_URL: &str = "COHORT_API_URL";
const ENV_SESSION_TOKEN: &str = "COHORT_SESSION_TOKEN";
const ENV_PROJECT: &str = "COHORT_PROJECT";
const ENV_IDENTITY_URL: &str = "COHORT_IDENTITY_URL";
const ENV_PAYLOAD_ENVELOPE: &str = "COHORT_PAYLOAD_ENVELOPE";

/// Connection establishment should fail fast.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 2;
/// Query execution may be long-running.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 900;
/// Listing cohorts is expected to be fast.
const DEFAULT_LIST_TIMEOUT_SECS: u64 = 30;

/// Shape of the outbound request body.
///
/// Observed service deployments accept either the flat payload or the same
/// payload wrapped under a `data` key, so the shape is configurable rather
/// than hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadEnvelope {
    /// `{"query": ..., "role": ..., "tables": [...]}`
    #[default]
    Flat,
    /// `{"data": {"query": ..., "role": ..., "tables": [...]}}`
    DataWrapped,
}

impl FromStr for PayloadEnvelope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "data" => Ok(Self::DataWrapped),
            _ => Err(format!(
                "Invalid payload envelope: {s}. Expected: flat or data"
            )),
        }
    }
}

/// Immutable client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the cohort-query service, without a trailing slash.
    pub base_url: String,
    /// Session credential carried as a cookie-style header on every request.
    pub session_token: String,
    /// Optional project identifier, sent as `X-Project-Name` when present.
    pub project: Option<String>,
    /// Identity provider endpoint. Defaults to `{base_url}/v1/identity`.
    pub identity_url: String,
    /// Request body shape.
    pub envelope: PayloadEnvelope,
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
    /// Bound on response completion for query submission.
    pub query_timeout: Duration,
    /// Bound on response completion for cohort listing.
    pub list_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with default timeouts and a derived identity endpoint.
    pub fn new(
        base_url: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = validate_base_url(base_url.into())?;
        let session_token = session_token.into();
        if session_token.is_empty() {
            return Err(ConfigError::Missing(ENV_SESSION_TOKEN));
        }
        let identity_url = format!("{base_url}/v1/identity");

        Ok(Self {
            base_url,
            session_token,
            project: None,
            identity_url,
            envelope: PayloadEnvelope::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            list_timeout: Duration::from_secs(DEFAULT_LIST_TIMEOUT_SECS),
        })
    }

    /// Loads configuration from the environment.
    ///
    /// Required: `COHORT_API_URL`, `COHORT_SESSION_TOKEN`.
    /// Optional: `COHORT_PROJECT`, `COHORT_IDENTITY_URL`,
    /// `COHORT_PAYLOAD_ENVELOPE` ("flat" or "data").
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = require_env(ENV_API_URL)?;
        let session_token = require_env(ENV_SESSION_TOKEN)?;

        let mut config = Self::new(base_url, session_token)?;
        config.project = optional_env(ENV_PROJECT);

        if let Some(identity_url) = optional_env(ENV_IDENTITY_URL) {
            config.identity_url = identity_url;
        }
        if let Some(envelope) = optional_env(ENV_PAYLOAD_ENVELOPE) {
            config.envelope = envelope
                .parse()
                .map_err(|e: String| ConfigError::invalid(ENV_PAYLOAD_ENVELOPE, e))?;
        }

        Ok(config)
    }

    /// Sets the project identifier.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the payload envelope shape.
    pub fn with_envelope(mut self, envelope: PayloadEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// Sets the connection establishment timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the query submission read timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the cohort listing read timeout.
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = timeout;
        self
    }
}

/// Validates the base URL and strips any trailing slash.
fn validate_base_url(raw: String) -> Result<String, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::Missing(ENV_API_URL));
    }
    let url =
        Url::parse(&raw).map_err(|e| ConfigError::invalid(ENV_API_URL, e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::invalid(
            ENV_API_URL,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
