//! Retrying, deadline-bounded client over an [`Oracle`].

use crate::config::{OracleConfig, RetryPolicy};
use crate::error::{AttemptError, OracleError};
use crate::{Oracle, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Wraps a raw [`Oracle`] with the retry and timeout policy for one call.
///
/// Holds no mutable state; clones share the underlying oracle and can be
/// used from any number of concurrent pipeline runs.
#[derive(Clone)]
pub struct OracleClient {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl OracleClient {
    /// Create a client with explicit policy.
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy, timeout: Duration) -> Self {
        OracleClient {
            oracle,
            retry,
            timeout,
        }
    }

    /// Create a client taking policy from an [`OracleConfig`].
    pub fn from_config(oracle: Arc<dyn Oracle>, config: &OracleConfig) -> Self {
        Self::new(oracle, config.retry, config.timeout())
    }

    /// Name of the wrapped oracle, for logs.
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Default deadline applied by [`OracleClient::invoke`].
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `prompt` under the client's default deadline.
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        self.invoke_with_timeout(prompt, self.timeout).await
    }

    /// Send `prompt`; the deadline covers every attempt and backoff sleep.
    pub async fn invoke_with_timeout(&self, prompt: &str, timeout: Duration) -> Result<String> {
        match tokio::time::timeout(timeout, self.invoke_with_retries(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(oracle = %self.oracle.name(), timeout_ms, "oracle call timed out");
                Err(OracleError::Timeout { timeout_ms })
            }
        }
    }

    async fn invoke_with_retries(&self, prompt: &str) -> Result<String> {
        let max_attempts = self.retry.max_retries.saturating_add(1);
        let mut last_reason = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match self.oracle.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(AttemptError::Rejected(reason)) => {
                    warn!(oracle = %self.oracle.name(), %reason, "oracle rejected prompt");
                    return Err(OracleError::Rejected { reason });
                }
                Err(AttemptError::Fatal(reason)) => {
                    warn!(oracle = %self.oracle.name(), %reason, "oracle call failed permanently");
                    return Err(OracleError::Unavailable {
                        attempts: attempt + 1,
                        reason,
                    });
                }
                Err(AttemptError::Transient(reason)) => {
                    if attempt + 1 < max_attempts {
                        warn!(
                            "oracle request failed (attempt {}/{}), retrying: {}",
                            attempt + 1,
                            max_attempts,
                            reason
                        );
                    }
                    last_reason = Some(reason);
                }
            }
        }

        Err(OracleError::Unavailable {
            attempts: max_attempts,
            reason: last_reason.unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }
}
