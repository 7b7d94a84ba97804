//! Mock identity provider for testing.

use async_trait::async_trait;

use crate::error::IdentityError;

use super::{CallerIdentity, IdentityProvider};

/// An identity provider that returns a predefined identity or failure.
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    arn: String,
    failure: Option<String>,
}

impl MockIdentityProvider {
    /// Creates a provider that reports the given principal string.
    pub fn with_arn(arn: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            failure: None,
        }
    }

    /// Creates a provider whose calls fail with a provider error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            arn: String::new(),
            failure: Some(reason.into()),
        }
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::with_arn("arn:aws:sts::000000000000:assumed-role/test-role/test-session")
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn caller_identity(&self) -> Result<CallerIdentity, IdentityError> {
        if let Some(reason) = &self.failure {
            return Err(IdentityError::ProviderUnavailable(reason.clone()));
        }
        Ok(CallerIdentity {
            arn: self.arn.clone(),
            account_id: Some("000000000000".to_string()),
        })
    }
}
