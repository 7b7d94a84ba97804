//! Error types for cohort-query.
//!
//! Each collaborator produces its own closed error enum; the response
//! classifier is the single place where kinds are mapped to caller-facing
//! messages. No error type here ever reaches a caller of the public client —
//! `execute`/`list_cohorts` convert every failure into a normalized result.

use thiserror::Error;

/// Errors from resolving the calling principal's identity.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The identity provider call itself failed (transport or credential error).
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider returned a descriptor with no principal string.
    #[error("identity ARN missing from provider")]
    MissingIdentity,

    /// The principal string does not have the expected structure.
    #[error("malformed identity ARN: {0}")]
    MalformedIdentity(String),

    /// The resource segment does not name a recognized principal kind.
    #[error("ARN does not contain a recognized principal kind: {0}")]
    UnrecognizedPrincipalKind(String),
}

/// Errors from preparing a SQL statement for submission.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Identity resolution failed while building the payload.
    #[error("identity resolution failed: {0}")]
    Identity(#[from] IdentityError),

    /// The SQL statement could not be parsed.
    #[error("failed to parse SQL syntax: {0}")]
    ParseFailure(String),

    /// The statement parsed but references no tables.
    #[error("no tables identified in query")]
    NoTablesFound,
}

/// Errors from submitting a prepared request and reading the response.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The request did not complete within the read timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (refused, DNS, TLS).
    #[error("network failure: {0}")]
    Network(String),

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// The service rejected the session credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The service reported an application-level error.
    #[error("application error: {0}")]
    Application(String),

    /// Query preparation failed before any request was issued.
    #[error("metadata extraction failed: {0}")]
    Metadata(#[from] MetadataError),

    /// An unanticipated local fault.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Construction-time configuration errors.
///
/// These are fatal: a process with missing or invalid configuration should not
/// start serving, so they are never converted to a normalized result.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A supplied value could not be parsed.
    #[error("invalid configuration for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    /// Creates an invalid-value error for the given setting.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}
