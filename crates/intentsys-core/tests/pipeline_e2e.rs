//! End-to-end pipeline runs against scripted oracles.

mod common;

use async_trait::async_trait;
use common::*;
use intentsys_core::{
    finalize, ObjectiveSet, Objective, Pipeline, Stage, StageError, Step, SystemReport,
};
use intentsys_oracle::fakes::StageRoutedOracle;
use intentsys_oracle::{AttemptError, Oracle, OracleClient, OracleError, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

fn speed() -> ObjectiveSet {
    ObjectiveSet::single(Objective::Speed)
}

#[tokio::test]
async fn photo_sharing_full_run() {
    let oracle = Arc::new(photo_oracle());
    let pipeline = pipeline_over(oracle.clone());

    let run = pipeline.run_all(INTENT, &speed()).await;
    assert!(run.is_complete(), "halted: {:?}", run.halted);
    assert_eq!(run.report.completed_stages(), Stage::ALL.to_vec());

    let intent = run.report.intent.as_ref().unwrap();
    assert_eq!(intent.goals.len(), 2);
    assert!(intent.constraints.contains(&"GDPR compliance".to_string()));

    let arch = run.report.architecture.as_ref().unwrap();
    let graph = run.report.graph.as_ref().unwrap();
    assert_eq!(graph.nodes.len(), arch.modules.len());
    assert!(graph.node("m3-thumbnailer").is_some());
    // the edge into the undeclared "cdn" module is dropped
    assert_eq!(graph.edges.len(), 3);
    for edge in &graph.edges {
        assert!(graph.node(&edge.source).is_some());
        assert!(graph.node(&edge.target).is_some());
    }

    let sim = run.report.simulation.as_ref().unwrap();
    assert_eq!(sim.failure_points[1].module, "m3-thumbnailer");
    assert_eq!(sim.failure_points[0].affected_modules, vec!["upload", "m3-thumbnailer"]);

    let opt = run.report.optimization.as_ref().unwrap();
    assert_eq!(opt.objective, speed());
    assert_eq!(run.report.optimized_graph.as_ref().unwrap().nodes.len(), 3);

    let explanation = run.report.explanation.as_ref().unwrap();
    let refs: Vec<&str> = explanation.entries.iter().map(|e| e.decision.as_str()).collect();
    assert_eq!(refs, vec!["R1", "R2"]);

    let fields: Vec<(Stage, &str)> = run
        .report
        .warnings
        .iter()
        .map(|w| (w.stage, w.field.as_str()))
        .collect();
    assert!(fields.contains(&(Stage::Generate, "data_flow[3]")));
    assert!(fields.contains(&(Stage::Generate, "modules[2].id")));
    assert!(fields.contains(&(Stage::Generate, "decision_rules[1].confidence")));
    assert!(fields.contains(&(Stage::Optimize, "objective")));
    assert!(fields.contains(&(Stage::Explain, "entries")));
    assert_eq!(run.report.warnings.len(), 6);

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 5);
    for (prompt, stage) in prompts.iter().zip(Stage::ALL) {
        assert!(prompt.contains(stage.marker()));
    }
    // the analysis reaches the GENERATE prompt
    assert!(prompts[1].contains("GDPR compliance"));
}

#[tokio::test]
async fn export_lists_every_stage() {
    let pipeline = pipeline_over(Arc::new(photo_oracle()));
    let run = pipeline.run_all(INTENT, &speed()).await;

    let raw = serde_json::to_value(run.export()).unwrap();
    let obj = raw.as_object().unwrap();
    for key in [
        "schema_version",
        "stages_completed",
        "intent",
        "architecture",
        "graph",
        "simulation",
        "optimization",
        "optimized_graph",
        "explanation",
        "warnings",
    ] {
        assert!(obj.contains_key(key), "missing {}", key);
    }
    assert_eq!(raw["stages_completed"][4], "EXPLAIN");
    assert!(run.failure_record().is_none());
}

#[tokio::test]
async fn unparseable_generate_halts_with_prior_output_kept() {
    let oracle = StageRoutedOracle::new()
        .route(Stage::Analyze.marker(), ANALYZE)
        .route(Stage::Generate.marker(), "I would suggest a microservice design.");
    let pipeline = pipeline_over(Arc::new(oracle));

    let run = pipeline.run_all(INTENT, &speed()).await;
    let (stage, error) = run.halted.as_ref().unwrap();
    assert_eq!(*stage, Stage::Generate);
    assert_eq!(error.kind(), "NormalizationError");
    assert_eq!(
        error.raw_response(),
        Some("I would suggest a microservice design.")
    );

    assert!(run.report.intent.is_some());
    assert!(run.report.architecture.is_none());
    assert!(run.report.graph.is_none());
    assert_eq!(finalize(&run.report).stages_completed, vec![Stage::Analyze]);

    let record = run.failure_record().unwrap();
    assert_eq!(record.stage, Stage::Generate);
    assert!(record.raw_response.is_some());
}

/// Routes like `StageRoutedOracle` but never answers one stage.
struct HangsOn {
    marker: &'static str,
    inner: StageRoutedOracle,
}

#[async_trait]
impl Oracle for HangsOn {
    async fn generate(&self, prompt: &str) -> Result<String, AttemptError> {
        if prompt.contains(self.marker) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.generate(prompt).await
    }

    fn name(&self) -> &str {
        "hangs-on"
    }
}

#[tokio::test(start_paused = true)]
async fn simulate_timeout_halts_pipeline() {
    let oracle = HangsOn {
        marker: Stage::Simulate.marker(),
        inner: photo_oracle(),
    };
    let pipeline = pipeline_over(Arc::new(oracle));

    let run = pipeline.run_all(INTENT, &speed()).await;
    let (stage, error) = run.halted.as_ref().unwrap();
    assert_eq!(*stage, Stage::Simulate);
    assert_eq!(
        *error,
        StageError::Oracle(OracleError::Timeout { timeout_ms: 2000 })
    );
    assert_eq!(
        run.report.completed_stages(),
        vec![Stage::Analyze, Stage::Generate]
    );
    assert_eq!(run.failure_record().unwrap().kind, "OracleTimeout");
}

#[tokio::test(start_paused = true)]
async fn rejection_is_not_retried() {
    let oracle = Arc::new(
        StageRoutedOracle::new()
            .fail_on(Stage::Analyze.marker(), AttemptError::Rejected("SAFETY".into())),
    );
    let pipeline = Pipeline::new(OracleClient::new(
        oracle.clone(),
        RetryPolicy {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 40,
        },
        Duration::from_secs(5),
    ));

    let failure = pipeline.analyze_intent(INTENT).await.unwrap_err();
    assert_eq!(failure.error.kind(), "OracleRejected");
    assert_eq!(oracle.prompts().len(), 1);
    assert_eq!(failure.report, SystemReport::new());
}

#[tokio::test]
async fn completed_stage_is_not_rerun() {
    let oracle = Arc::new(photo_oracle());
    let pipeline = pipeline_over(oracle.clone());

    let first = pipeline.analyze_intent(INTENT).await.unwrap();
    let step = Step::Analyze {
        intent: INTENT.to_string(),
    };
    let failure = pipeline.run(&step, first.report.clone()).await.unwrap_err();

    assert_eq!(
        failure.error,
        StageError::AlreadyCompleted {
            stage: Stage::Analyze
        }
    );
    assert_eq!(failure.report, first.report);
    assert_eq!(oracle.prompts().len(), 1);
}

#[tokio::test]
async fn missing_prerequisite_never_reaches_the_oracle() {
    let oracle = Arc::new(photo_oracle());
    let pipeline = pipeline_over(oracle.clone());

    let failure = pipeline.explain_system(SystemReport::new()).await.unwrap_err();
    assert_eq!(failure.stage, Stage::Explain);
    assert_eq!(failure.error.kind(), "CompilationError");
    assert!(oracle.prompts().is_empty());

    let failure = pipeline
        .optimize_system(Default::default(), ObjectiveSet::default())
        .await
        .unwrap_err();
    assert_eq!(failure.error.kind(), "CompilationError");
    assert!(oracle.prompts().is_empty());
}

#[tokio::test]
async fn stages_run_individually_from_supplied_inputs() {
    let pipeline = pipeline_over(Arc::new(photo_oracle()));

    let analysis = pipeline.analyze_intent(INTENT).await.unwrap();
    assert!(analysis.warnings.is_empty());
    assert_eq!(analysis.prompt_digest.len(), 64);

    let intent = analysis.report.intent.clone().unwrap();
    let generated = pipeline.generate_system(intent).await.unwrap();
    let arch = generated.report.architecture.clone().unwrap();
    assert_eq!(generated.warnings.len(), 4);

    let simulated = pipeline.simulate_failure(arch.clone()).await.unwrap();
    assert!(simulated.report.simulation.is_some());
    assert!(simulated.report.intent.is_none());

    let optimized = pipeline
        .optimize_system(arch, ObjectiveSet::single(Objective::Cost))
        .await
        .unwrap();
    // oracle echoed COST, which matches the request
    assert!(optimized.warnings.is_empty());

    let explained = pipeline
        .explain_system(simulated.report.clone())
        .await
        .unwrap();
    assert!(explained.report.simulation.is_some());
    assert_eq!(explained.report.explanation.unwrap().entries.len(), 2);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let pipeline = pipeline_over(Arc::new(photo_oracle()));

    let runs = futures::future::join_all((0..8).map(|_| {
        let pipeline = pipeline.clone();
        async move { pipeline.run_all(INTENT, &speed()).await }
    }))
    .await;

    let mut ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    for run in &runs {
        assert!(run.is_complete());
        assert_eq!(run.report, runs[0].report);
    }
}
