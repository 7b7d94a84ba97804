//! HTTP identity provider.
//!
//! Queries the platform's identity endpoint for the calling principal. One
//! provider call is issued per resolution; results are never cached.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::IdentityError;

use super::{CallerIdentity, IdentityProvider};

/// Identity lookups should be fast; fail quickly when the provider is down.
const IDENTITY_TIMEOUT_SECS: u64 = 10;

/// Identity provider backed by an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    endpoint: String,
    session_token: String,
    client: Client,
}

impl HttpIdentityProvider {
    /// Creates a provider for the given identity endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(IDENTITY_TIMEOUT_SECS))
            .build()
            .map_err(|e| IdentityError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            session_token: session_token.into(),
            client,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn caller_identity(&self) -> Result<CallerIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("Cookie", format!("session={}", self.session_token))
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::ProviderUnavailable(format!(
                "identity endpoint returned {}",
                response.status()
            )));
        }

        let descriptor: IdentityDescriptor = response
            .json()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(e.to_string()))?;

        Ok(CallerIdentity {
            arn: descriptor.arn.unwrap_or_default(),
            account_id: descriptor.account,
        })
    }
}

/// Wire shape of the identity endpoint response.
#[derive(Debug, Deserialize)]
struct IdentityDescriptor {
    #[serde(rename = "Arn")]
    arn: Option<String>,
    #[serde(rename = "Account")]
    account: Option<String>,
}
