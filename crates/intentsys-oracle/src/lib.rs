//! intentsys-oracle: the outbound reasoning capability
//!
//! The reasoning service is modelled as an opaque `generate(prompt) → text`
//! capability behind the [`Oracle`] trait. [`OracleClient`] layers the call
//! policy on top: bounded retries with exponential backoff for transient
//! failures, no retry on content-policy refusals, and a deadline per call.
//!
//! ## Modules
//!
//! - [`config`]: `OracleConfig`, `RetryPolicy`
//! - [`client`]: `OracleClient`
//! - [`gemini`]: HTTP implementation against a Gemini-compatible endpoint
//! - [`fakes`]: in-memory oracles for tests

pub mod client;
pub mod config;
pub mod error;
pub mod fakes;
pub mod gemini;

use async_trait::async_trait;

pub use client::OracleClient;
pub use config::{OracleConfig, RetryPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{AttemptError, OracleError};
pub use gemini::GeminiOracle;

/// Result type for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// A text-in/text-out reasoning service.
///
/// Implementations make exactly one attempt per call and classify failures;
/// retrying is the client's job.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send one prompt and return the raw answer text.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, AttemptError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}
