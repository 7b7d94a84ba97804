//! Caller identity resolution.
//!
//! The remote service authorizes queries by role name, extracted from an
//! ARN-like principal string supplied by an identity provider. The provider
//! is an explicit dependency behind a trait so it can be substituted with a
//! test double.

pub mod http;
pub mod mock;

pub use http::HttpIdentityProvider;
pub use mock::MockIdentityProvider;

use async_trait::async_trait;

use crate::error::IdentityError;

/// Identity descriptor returned by the provider.
///
/// Created fresh per resolution call; never cached.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    /// Colon-delimited principal string whose 6th segment encodes a resource
    /// kind and name (e.g. `arn:aws:sts::123:assumed-role/my-role/session`).
    pub arn: String,
    /// Owning account, when the provider reports one.
    pub account_id: Option<String>,
}

/// Trait for identity providers that report the calling principal.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the calling principal's identity descriptor.
    async fn caller_identity(&self) -> Result<CallerIdentity, IdentityError>;
}

/// Resolves the effective role name via the given provider.
pub async fn resolve_role(provider: &dyn IdentityProvider) -> Result<String, IdentityError> {
    let identity = provider.caller_identity().await?;
    role_from_arn(&identity.arn)
}

/// Extracts the role or user name from an ARN-like principal string.
///
/// The resource segment (index 5 after splitting on `:`) must begin with one
/// of `assumed-role/`, `role/`, or `user/`; the name is the second
/// `/`-delimited component in every recognized case. Resolution fails rather
/// than defaulting when the string is absent or malformed.
pub fn role_from_arn(arn: &str) -> Result<String, IdentityError> {
    if arn.is_empty() {
        return Err(IdentityError::MissingIdentity);
    }

    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 6 {
        return Err(IdentityError::MalformedIdentity(arn.to_string()));
    }

    let resource = parts[5];

    // assumed-role ARNs carry a trailing session name
    let min_segments = if resource.starts_with("assumed-role/") {
        3
    } else if resource.starts_with("role/") || resource.starts_with("user/") {
        2
    } else {
        return Err(IdentityError::UnrecognizedPrincipalKind(arn.to_string()));
    };

    let segments: Vec<&str> = resource.split('/').collect();
    if segments.len() < min_segments {
        return Err(IdentityError::MalformedIdentity(arn.to_string()));
    }

    Ok(segments[1].to_string())
}
