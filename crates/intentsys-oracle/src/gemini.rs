//! Gemini-compatible HTTP oracle
//!
//! Speaks the `models/{model}:generateContent` REST shape. Only the pieces the
//! pipeline needs are modelled: one user turn in, concatenated text parts out.

use crate::config::OracleConfig;
use crate::error::{AttemptError, OracleError};
use crate::{Oracle, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Finish reasons that mean the service refused on policy grounds.
const POLICY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

/// Response body of `generateContent`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Map a non-success HTTP status to an attempt classification.
pub fn classify_status(status: StatusCode, body: &str) -> AttemptError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status.as_u16() {
        408 | 429 => AttemptError::Transient(detail),
        s if (500..=599).contains(&s) => AttemptError::Transient(detail),
        _ => AttemptError::Fatal(detail),
    }
}

/// Pull the answer text out of a decoded response.
pub fn extract_text(response: GenerateResponse) -> std::result::Result<String, AttemptError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(AttemptError::Rejected(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AttemptError::Transient("response carried no candidates".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if POLICY_FINISH_REASONS.contains(&reason) {
            return Err(AttemptError::Rejected(format!("generation stopped: {}", reason)));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(AttemptError::Transient("empty response from oracle".to_string()));
    }
    Ok(text.to_string())
}

/// HTTP oracle against a Gemini-compatible endpoint
pub struct GeminiOracle {
    config: OracleConfig,
    http_client: reqwest::Client,
}

impl GeminiOracle {
    /// Create a new oracle; fails fast on an unusable config.
    pub fn new(config: OracleConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("intentsys-oracle/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(GeminiOracle {
            config,
            http_client,
        })
    }

    /// Create oracle from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OracleConfig::from_env())
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model_id()
        )
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, AttemptError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: "application/json",
            },
        };

        let mut builder = self.http_client.post(self.url()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), model = %self.config.model_id(), "oracle responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let decoded: GenerateResponse = response.json().await?;
        extract_text(decoded)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
