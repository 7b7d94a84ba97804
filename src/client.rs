//! Submission client for the cohort-query service.
//!
//! `execute` and `list_cohorts` never return an error type: every failure
//! along the pipeline — identity, parsing, transport, the service's own error
//! envelope — is converted into the uniform `{"error": ...}` result shape.

use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{ClientConfig, PayloadEnvelope};
use crate::error::{ConfigError, MetadataError, SubmitError};
use crate::identity::{resolve_role, HttpIdentityProvider, IdentityProvider};
use crate::metadata::{QueryPreparer, SubmissionPayload};
use crate::response::{classify_response, classify_transport, error_result};

/// Client for submitting queries and listing cohorts.
///
/// Holds no mutable state; safe to share across tasks.
pub struct CohortClient {
    config: ClientConfig,
    http: Client,
    provider: Arc<dyn IdentityProvider>,
    preparer: QueryPreparer,
}

impl CohortClient {
    /// Creates a client with an HTTP identity provider derived from the config.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let provider = HttpIdentityProvider::new(&config.identity_url, &config.session_token)
            .map_err(|e| ConfigError::invalid("identity provider", e.to_string()))?;
        Self::with_identity_provider(config, Arc::new(provider))
    }

    /// Creates a client with an explicit identity provider.
    ///
    /// Used to substitute a test double for the provider.
    pub fn with_identity_provider(
        config: ClientConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ConfigError> {
        // Connection establishment fails fast; response reads get their own
        // per-request bounds.
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::invalid("http client", e.to_string()))?;

        let preparer = QueryPreparer::new(Arc::clone(&provider));

        Ok(Self {
            config,
            http,
            provider,
            preparer,
        })
    }

    /// Submits a SQL statement for execution.
    ///
    /// Returns either the service's raw JSON body or `{"error": ...}`.
    pub async fn execute(&self, sql: &str) -> Value {
        info!("submitting query for execution");
        match self.try_execute(sql).await {
            Ok(body) => {
                info!("query submission succeeded");
                body
            }
            Err(err) => {
                log_failure(&err);
                error_result(&err)
            }
        }
    }

    /// Lists cohorts visible to the resolved role.
    ///
    /// Returns either the service's raw JSON body or `{"error": ...}`.
    pub async fn list_cohorts(&self) -> Value {
        info!("listing cohorts");
        match self.try_list_cohorts().await {
            Ok(body) => {
                info!("cohort listing succeeded");
                body
            }
            Err(err) => {
                log_failure(&err);
                error_result(&err)
            }
        }
    }

    async fn try_execute(&self, sql: &str) -> Result<Value, SubmitError> {
        let payload = self.preparer.prepare(sql).await.map_err(SubmitError::from)?;
        let body = wrap_payload(&payload, self.config.envelope);

        let mut request = self
            .http
            .post(format!("{}/v1/execute", self.config.base_url))
            .header("Accept", "application/json")
            .header("Cookie", format!("session={}", self.config.session_token))
            .timeout(self.config.query_timeout)
            .json(&body);
        if let Some(project) = &self.config.project {
            request = request.header("X-Project-Name", project);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify_transport)?;

        classify_response(status, &bytes)
    }

    async fn try_list_cohorts(&self) -> Result<Value, SubmitError> {
        let role = resolve_role(self.provider.as_ref())
            .await
            .map_err(|e| SubmitError::from(MetadataError::from(e)))?;

        let mut request = self
            .http
            .get(format!("{}/v1/cohorts", self.config.base_url))
            .query(&[("role", role.as_str())])
            .header("Accept", "application/json")
            .header("Cookie", format!("session={}", self.config.session_token))
            .timeout(self.config.list_timeout);
        if let Some(project) = &self.config.project {
            request = request.header("X-Project-Name", project);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify_transport)?;

        classify_response(status, &bytes)
    }
}

/// Wraps the payload per the configured envelope shape.
fn wrap_payload(payload: &SubmissionPayload, envelope: PayloadEnvelope) -> Value {
    match envelope {
        PayloadEnvelope::Flat => json!(payload),
        PayloadEnvelope::DataWrapped => json!({ "data": payload }),
    }
}

/// Logs a classified failure: warning for caller errors, error for
/// infrastructure faults.
fn log_failure(err: &SubmitError) {
    match err {
        SubmitError::Metadata(_)
        | SubmitError::Unauthorized
        | SubmitError::Application(_) => {
            warn!("request failed: {err}");
        }
        SubmitError::Timeout
        | SubmitError::Network(_)
        | SubmitError::InvalidBody(_)
        | SubmitError::Internal(_) => {
            error!("request failed: {err}");
        }
    }
}
