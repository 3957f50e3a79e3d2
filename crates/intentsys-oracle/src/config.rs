//! Oracle configuration
//!
//! Values are injected into the client, never read from global state after
//! construction. `Default` pulls them from the environment so binaries can
//! be configured without flags.

use crate::error::OracleError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Gemini-compatible REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-pro-latest";
/// Default per-call deadline in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Reasoning service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the generateContent-style API
    pub endpoint: String,
    /// Model name, with or without the `models/` prefix
    pub model: String,
    /// API key; never serialized
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Deadline for one logical call, retries included
    pub timeout_secs: u64,
    /// Retry bounds
    pub retry: RetryPolicy,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for OracleConfig {
    fn default() -> Self {
        let retry = RetryPolicy {
            max_retries: env_or("INTENTSYS_ORACLE_MAX_RETRIES", RetryPolicy::default().max_retries),
            ..RetryPolicy::default()
        };
        OracleConfig {
            endpoint: std::env::var("INTENTSYS_ORACLE_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            model: std::env::var("INTENTSYS_ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: env_or("INTENTSYS_ORACLE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            retry,
        }
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl OracleConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific endpoint and model
    pub fn new(endpoint: &str, model: &str) -> Self {
        OracleConfig {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Set the per-call deadline
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-call deadline as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Model path segment without the `models/` prefix
    pub fn model_id(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }

    /// Reject configs that cannot possibly reach the service.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(OracleError::Config("oracle endpoint is empty".to_string()));
        }
        if self.model_id().trim().is_empty() {
            return Err(OracleError::Config("oracle model is empty".to_string()));
        }
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(OracleError::Config(
                "GEMINI_API_KEY is not set; pass --api-key or export it".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(OracleError::Config("timeout must be at least one second".to_string()));
        }
        Ok(())
    }
}
