//! Upload-and-share scenario run through every stage with well-formed
//! oracle answers.

mod common;

use common::pipeline_over;
use intentsys_core::{Objective, ObjectiveSet, RiskLevel, Stage};
use intentsys_oracle::fakes::StageRoutedOracle;
use std::sync::Arc;

const INTENT: &str = "Build a system that lets users upload photos and share them with friends, prioritizing low latency";

const ANALYZE: &str = r#"{
  "goals": ["enable photo upload", "enable sharing"],
  "constraints": ["p95 request latency under 200ms"],
  "actors": ["user", "friend"],
  "success_metrics": ["share delivered within 1s"]
}"#;

const GENERATE: &str = r#"{
  "modules": [
    {"id": "upload", "name": "Upload Service", "responsibility": "accept and store photo uploads", "inputs": ["photo"], "outputs": ["photo id"]},
    {"id": "sharing", "name": "Sharing Service", "responsibility": "distribute photos to friends", "inputs": ["photo id"], "outputs": ["share notification"]},
    {"id": "store", "name": "Photo Store", "responsibility": "persist photos", "inputs": ["photo"], "outputs": ["photo url"]}
  ],
  "data_flow": [
    {"source": "upload", "target": "store", "label": "photo bytes"},
    {"source": "upload", "target": "sharing", "label": "photo ids"}
  ],
  "decision_rules": [
    {"condition": "photo larger than 10MB", "action": "compress before storing", "confidence": 80, "risk_level": "LOW"},
    {"condition": "friend list over 500", "action": "fan out asynchronously", "confidence": 65, "risk_level": "MEDIUM"}
  ]
}"#;

const SIMULATE: &str = r#"{
  "best_case": "store latency spike absorbed by upload buffering",
  "worst_case": "store outage blocks uploads and shares",
  "failure_points": [
    {"module": "store", "impact": "uploads fail", "affected_modules": ["upload", "sharing"], "mitigation": "replicate across zones"}
  ],
  "overall_risk": "MEDIUM"
}"#;

const OPTIMIZE: &str = r#"{
  "objective": "SPEED",
  "optimized_architecture": {
    "modules": [
      {"id": "upload", "name": "Upload Service", "responsibility": "accept uploads and write to edge cache", "inputs": ["photo"], "outputs": ["photo id"]},
      {"id": "sharing", "name": "Sharing Service", "responsibility": "distribute photos to friends", "inputs": ["photo id"], "outputs": ["share notification"]},
      {"id": "store", "name": "Photo Store", "responsibility": "persist photos", "inputs": ["photo"], "outputs": ["photo url"]},
      {"id": "edge-cache", "name": "Edge Cache", "responsibility": "serve recent photos close to friends", "inputs": ["photo"], "outputs": ["photo url"]}
    ],
    "data_flow": [
      {"source": "upload", "target": "edge-cache", "label": "photo bytes"},
      {"source": "edge-cache", "target": "store", "label": "write-behind"},
      {"source": "upload", "target": "sharing", "label": "photo ids"}
    ],
    "decision_rules": []
  },
  "tradeoffs": ["higher storage cost for cached copies"]
}"#;

const EXPLAIN: &str = r#"{"entries": [
  {"decision": "R1", "justification": "smaller files keep upload latency low", "confidence": 80, "risk_level": "LOW"},
  {"decision": "R2", "justification": "async fan-out keeps the upload path fast", "confidence": 70, "risk_level": "MEDIUM"}
]}"#;

fn upload_oracle() -> StageRoutedOracle {
    StageRoutedOracle::new()
        .route(Stage::Analyze.marker(), ANALYZE)
        .route(Stage::Generate.marker(), GENERATE)
        .route(Stage::Simulate.marker(), SIMULATE)
        .route(Stage::Optimize.marker(), OPTIMIZE)
        .route(Stage::Explain.marker(), EXPLAIN)
}

#[tokio::test]
async fn upload_and_share_runs_every_stage() {
    let pipeline = pipeline_over(Arc::new(upload_oracle()));
    let run = pipeline
        .run_all(INTENT, &ObjectiveSet::single(Objective::Speed))
        .await;
    assert!(run.is_complete(), "halted: {:?}", run.halted);
    assert!(run.report.warnings.is_empty(), "{:?}", run.report.warnings);

    let intent = run.report.intent.as_ref().unwrap();
    assert!(intent.goals.contains(&"enable photo upload".to_string()));
    assert!(intent.goals.contains(&"enable sharing".to_string()));
    assert!(intent
        .constraints
        .iter()
        .any(|c| c.to_lowercase().contains("latency")));

    let arch = run.report.architecture.as_ref().unwrap();
    let graph = run.report.graph.as_ref().unwrap();
    assert_eq!(graph.nodes.len(), arch.modules.len());
    assert!(graph.node("upload").is_some());
    assert!(graph.node("sharing").is_some());
    assert!(graph
        .edges
        .iter()
        .any(|e| e.source == "upload" && e.target == "sharing"));

    let sim = run.report.simulation.as_ref().unwrap();
    assert!(matches!(
        sim.overall_risk,
        RiskLevel::Low | RiskLevel::Medium | RiskLevel::High
    ));
    assert!(!sim.failure_points.is_empty());
    for point in &sim.failure_points {
        assert!(graph.node(&point.module).is_some());
    }

    let opt = run.report.optimization.as_ref().unwrap();
    assert!(opt.objective.contains(Objective::Speed));
    assert_ne!(opt.optimized_architecture, *arch);
    assert!(!opt.tradeoffs.is_empty());
    assert!(run.report.optimized_graph.as_ref().unwrap().node("edge-cache").is_some());

    let explanation = run.report.explanation.as_ref().unwrap();
    assert!(explanation.entries.len() >= arch.decision_rules.len());
}
