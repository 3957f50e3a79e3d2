//! Error types for intentsys-oracle

use thiserror::Error;

/// Outcome of a single attempt against the reasoning service.
///
/// The classification drives the retry loop in [`crate::OracleClient`]:
/// only `Transient` failures are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Network error, rate limit, server-side failure or empty answer
    #[error("transient oracle failure: {0}")]
    Transient(String),

    /// Explicit content-policy refusal
    #[error("oracle refused the prompt: {0}")]
    Rejected(String),

    /// Anything retrying cannot fix (bad credentials, malformed request)
    #[error("oracle call failed: {0}")]
    Fatal(String),
}

impl AttemptError {
    /// Whether the retry loop may try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Transient(_))
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            if status.as_u16() == 429 || status.is_server_error() {
                return AttemptError::Transient(err.to_string());
            }
            return AttemptError::Fatal(err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            AttemptError::Transient(err.to_string())
        } else {
            AttemptError::Fatal(err.to_string())
        }
    }
}

/// Errors surfaced by [`crate::OracleClient::invoke`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Retries exhausted, or a non-retryable transport failure
    #[error("oracle unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { attempts: u32, reason: String },

    /// The call deadline elapsed before an answer arrived
    #[error("oracle call exceeded its {timeout_ms} ms deadline")]
    Timeout { timeout_ms: u64 },

    /// Content-policy refusal, never retried
    #[error("oracle rejected the prompt: {reason}")]
    Rejected { reason: String },

    /// Missing endpoint or credential, or an HTTP client that cannot be built
    #[error("oracle configuration error: {0}")]
    Config(String),
}
