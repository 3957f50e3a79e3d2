//! Shared fixtures: a photo-sharing service scripted stage by stage.
#![allow(dead_code)]

use intentsys_core::{Pipeline, Stage};
use intentsys_oracle::fakes::StageRoutedOracle;
use intentsys_oracle::{Oracle, OracleClient, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

pub const INTENT: &str =
    "Build a photo-sharing service where users upload pictures, get thumbnails and browse a feed.";

pub const ANALYZE: &str = r#"Here is the analysis you asked for:
```json
{
  "goals": ["Let users upload and share photos", "Generate thumbnails automatically"],
  "constraints": ["GDPR compliance", "p95 latency under 300ms"],
  "actors": ["end user", "moderator"],
  "success_metrics": ["99.9% monthly uptime"]
}
```"#;

pub const GENERATE: &str = r#"{
  "modules": [
    {"id": "upload", "name": "Upload API", "responsibility": "accept photo uploads", "inputs": ["photo"], "outputs": ["blob"]},
    {"id": "storage", "name": "Blob Storage", "responsibility": "persist originals", "inputs": ["blob"], "outputs": ["blob ref"]},
    {"name": "Thumbnailer", "responsibility": "resize images", "inputs": ["blob ref"], "outputs": ["thumbnail"]},
    {"id": "feed", "name": "Feed Service", "responsibility": "serve the photo feed", "inputs": ["thumbnail"], "outputs": ["feed page"]}
  ],
  "data_flow": [
    {"source": "upload", "target": "storage", "label": "raw photos"},
    {"from": "storage", "to": "Thumbnailer", "data": "images"},
    {"flow_name": "publish", "steps": ["Thumbnailer -> feed"]},
    {"source": "feed", "target": "cdn", "label": "static assets"}
  ],
  "decision_rules": [
    {"condition": "upload size > 20MB", "action": "reject with 413", "confidence": 90, "risk_level": "LOW"},
    {"condition": "thumbnail queue > 1000", "action": "scale thumbnailer", "confidence": 0.7, "risk_level": "MEDIUM"}
  ]
}"#;

pub const SIMULATE: &str = r#"{
  "best_case": "storage outage is absorbed by retries",
  "worst_case": "uploads fail and the feed goes stale",
  "failure_points": [
    {"module": "storage", "impact": "uploads rejected", "affected_modules": ["upload", "Thumbnailer"], "mitigation": "multi-region replication"},
    {"module": "Thumbnailer", "impact": "feed shows placeholders", "affected_modules": ["feed"], "mitigation": "lazy thumbnailing"}
  ],
  "overall_risk": "MEDIUM"
}"#;

pub const OPTIMIZE: &str = r#"{
  "objective": "COST",
  "optimized_architecture": {
    "modules": [
      {"id": "upload", "name": "Upload API", "responsibility": "accept uploads and resize inline", "inputs": ["photo"], "outputs": ["blob", "thumbnail"]},
      {"id": "storage", "name": "Blob Storage", "responsibility": "persist originals and thumbnails", "inputs": ["blob"], "outputs": ["blob ref"]},
      {"id": "feed", "name": "Feed Service", "responsibility": "serve the feed from cache", "inputs": ["blob ref"], "outputs": ["feed page"]}
    ],
    "data_flow": [
      {"source": "upload", "target": "storage", "label": "photos and thumbnails"},
      {"source": "storage", "target": "feed", "label": "refs"}
    ],
    "decision_rules": []
  },
  "tradeoffs": ["uploads get slower", "one fewer service to run"]
}"#;

pub const EXPLAIN: &str = r#"Sure.
{"entries": [
  {"decision": "R1", "justification": "large uploads dominate storage cost", "confidence": 85, "risk_level": "LOW"}
]}"#;

/// Oracle answering every stage of the photo-sharing scenario.
pub fn photo_oracle() -> StageRoutedOracle {
    StageRoutedOracle::new()
        .route(Stage::Analyze.marker(), ANALYZE)
        .route(Stage::Generate.marker(), GENERATE)
        .route(Stage::Simulate.marker(), SIMULATE)
        .route(Stage::Optimize.marker(), OPTIMIZE)
        .route(Stage::Explain.marker(), EXPLAIN)
}

/// Pipeline over `oracle` with no retries and a 2s deadline.
pub fn pipeline_over(oracle: Arc<dyn Oracle>) -> Pipeline {
    Pipeline::new(OracleClient::new(
        oracle,
        RetryPolicy::none(),
        Duration::from_secs(2),
    ))
}
