//! Response classification.
//!
//! Maps every failure mode — transport errors, timeouts, malformed bodies,
//! HTTP error statuses, application-level error envelopes — into a small
//! fixed vocabulary of caller-safe messages. This is the single exhaustive
//! mapping stage; internal detail is logged here and never surfaced.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::SubmitError;

/// Caller-facing messages, one per failure category.
pub const MSG_TIMEOUT: &str = "The request took too long to process.";
pub const MSG_UNAVAILABLE: &str = "Service temporarily unavailable.";
pub const MSG_INVALID_BODY: &str = "Invalid response from query execution.";
pub const MSG_UNAUTHORIZED: &str = "User authentication failed.";
pub const MSG_BAD_QUERY: &str = "The provided query is invalid or lacks permissions.";
pub const MSG_EXECUTION_FAILED: &str = "Query execution failed.";
pub const MSG_INTERNAL: &str = "An internal error occurred.";

/// Application-level error envelope:
/// `{"status": {"ok": false, "error": {"details": {"err": "..."}}}}`.
///
/// Every level is optional; absence at any level means the envelope does not
/// apply and classification falls through to the next rule.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: Option<ResponseStatus>,
}

#[derive(Debug, Deserialize)]
struct ResponseStatus {
    #[serde(default)]
    ok: bool,
    error: Option<StatusError>,
}

#[derive(Debug, Deserialize)]
struct StatusError {
    details: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    err: Option<String>,
}

/// Classifies a transport-level failure from the HTTP client.
pub fn classify_transport(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout
    } else if err.is_connect() || err.is_request() {
        SubmitError::Network(err.to_string())
    } else {
        SubmitError::Internal(err.to_string())
    }
}

/// Classifies a received HTTP response into a normalized result.
///
/// Returns the parsed body on success. A non-success status never passes
/// through as success: when the body carries no recognized error envelope the
/// outcome is a generic application error.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Result<Value, SubmitError> {
    // Unauthorized is decided on status alone, before the body is even parsed
    if status == StatusCode::UNAUTHORIZED {
        return Err(SubmitError::Unauthorized);
    }

    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                status = %status,
                body = %String::from_utf8_lossy(body),
                "response body is not valid JSON: {e}"
            );
            return Err(SubmitError::InvalidBody(e.to_string()));
        }
    };

    if !status.is_success() {
        if let Some(err) = application_error(&parsed) {
            return Err(SubmitError::Application(err));
        }
        return Err(SubmitError::Application(MSG_EXECUTION_FAILED.to_string()));
    }

    Ok(parsed)
}

/// Extracts `status.error.details.err` when the envelope reports a failure.
fn application_error(body: &Value) -> Option<String> {
    let envelope: StatusEnvelope = serde_json::from_value(body.clone()).ok()?;
    let status = envelope.status?;
    if status.ok {
        return None;
    }
    status.error?.details?.err
}

/// Converts a classified error into the uniform `{"error": ...}` result.
pub fn error_result(err: &SubmitError) -> Value {
    json!({ "error": message_for(err) })
}

/// The caller-safe message for each error kind.
fn message_for(err: &SubmitError) -> String {
    match err {
        SubmitError::Timeout => MSG_TIMEOUT.to_string(),
        SubmitError::Network(_) => MSG_UNAVAILABLE.to_string(),
        SubmitError::InvalidBody(_) => MSG_INVALID_BODY.to_string(),
        SubmitError::Unauthorized => MSG_UNAUTHORIZED.to_string(),
        SubmitError::Application(message) => message.clone(),
        SubmitError::Metadata(_) => MSG_BAD_QUERY.to_string(),
        SubmitError::Internal(_) => MSG_INTERNAL.to_string(),
    }
}
