//! Stage pipeline: ANALYZE → GENERATE → SIMULATE → OPTIMIZE → EXPLAIN.
//!
//! Each stage compiles a prompt from the report so far, calls the oracle,
//! normalizes the answer and returns a new report with its output added.
//! A failing stage hands back the report it was given, untouched.

use crate::domain::{
    CompilationError, Explanation, ExplanationEntry, FailureSimulation, IntentAnalysis,
    ObjectiveSet, OptimizationResult, Result, Stage, StageError, SystemArchitecture, Warning,
};
use crate::graph;
use crate::normalize::normalize;
use crate::obs;
use crate::prompt::{self, PromptInput};
use crate::report::{finalize, ReportExport, SystemReport};
use intentsys_oracle::OracleClient;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// One stage invocation with its stage-specific arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Analyze { intent: String },
    Generate,
    Simulate,
    Optimize { objectives: ObjectiveSet },
    Explain,
}

impl Step {
    pub fn stage(&self) -> Stage {
        match self {
            Step::Analyze { .. } => Stage::Analyze,
            Step::Generate => Stage::Generate,
            Step::Simulate => Stage::Simulate,
            Step::Optimize { .. } => Stage::Optimize,
            Step::Explain => Stage::Explain,
        }
    }
}

/// A stage that completed.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Input report plus this stage's output and warnings.
    pub report: SystemReport,
    /// Warnings raised by this stage alone.
    pub warnings: Vec<Warning>,
    /// SHA-256 of the prompt sent to the oracle.
    pub prompt_digest: String,
}

/// A stage that failed, with the report exactly as it was handed in.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: StageError,
    pub report: SystemReport,
}

/// Serializable record of the stage that halted a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureRecord {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl FailureRecord {
    pub fn new(stage: Stage, error: &StageError) -> Self {
        FailureRecord {
            stage,
            kind: error.kind().to_string(),
            message: error.to_string(),
            raw_response: error.raw_response().map(str::to_string),
        }
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: String,
    /// Everything completed before the run ended.
    pub report: SystemReport,
    /// The stage that halted the run, if any.
    pub halted: Option<(Stage, StageError)>,
}

impl PipelineRun {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }

    pub fn export(&self) -> ReportExport {
        finalize(&self.report)
    }

    pub fn failure_record(&self) -> Option<FailureRecord> {
        self.halted
            .as_ref()
            .map(|(stage, error)| FailureRecord::new(*stage, error))
    }
}

/// Drives stages against one oracle client.
///
/// Holds no per-run state; clones share the client and independent runs
/// may proceed concurrently.
#[derive(Clone)]
pub struct Pipeline {
    client: OracleClient,
}

impl Pipeline {
    pub fn new(client: OracleClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OracleClient {
        &self.client
    }

    /// Run a single stage over `report`.
    pub async fn run(
        &self,
        step: &Step,
        report: SystemReport,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        let stage = step.stage();
        match self.execute(step, &report).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                obs::emit_stage_failed(stage, &error);
                Err(StageFailure {
                    stage,
                    error,
                    report,
                })
            }
        }
    }

    /// Run every stage in order, halting at the first failure.
    pub async fn run_all(&self, intent: &str, objectives: &ObjectiveSet) -> PipelineRun {
        let run_id = Uuid::new_v4().to_string();
        let steps = [
            Step::Analyze {
                intent: intent.to_string(),
            },
            Step::Generate,
            Step::Simulate,
            Step::Optimize {
                objectives: objectives.clone(),
            },
            Step::Explain,
        ];

        let mut report = SystemReport::new();
        let mut halted = None;
        for step in &steps {
            let span = obs::stage_span(&run_id, step.stage());
            match self.run(step, report).instrument(span).await {
                Ok(outcome) => report = outcome.report,
                Err(failure) => {
                    report = failure.report;
                    halted = Some((failure.stage, failure.error));
                    break;
                }
            }
        }

        obs::emit_pipeline_finished(
            &run_id,
            report.completed_stages().len(),
            halted.as_ref().map(|(stage, _)| *stage),
        );
        PipelineRun {
            run_id,
            report,
            halted,
        }
    }

    /// ANALYZE from free-form intent text.
    pub async fn analyze_intent(
        &self,
        intent: &str,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        let step = Step::Analyze {
            intent: intent.to_string(),
        };
        self.run(&step, SystemReport::new()).await
    }

    /// GENERATE from a caller-supplied analysis.
    pub async fn generate_system(
        &self,
        analysis: IntentAnalysis,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        self.run(&Step::Generate, SystemReport::new().with_intent(analysis))
            .await
    }

    /// SIMULATE against a caller-supplied architecture.
    pub async fn simulate_failure(
        &self,
        arch: SystemArchitecture,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        self.run(&Step::Simulate, SystemReport::new().with_architecture(arch))
            .await
    }

    /// OPTIMIZE a caller-supplied architecture for `objectives`.
    pub async fn optimize_system(
        &self,
        arch: SystemArchitecture,
        objectives: ObjectiveSet,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        let step = Step::Optimize { objectives };
        self.run(&step, SystemReport::new().with_architecture(arch))
            .await
    }

    /// EXPLAIN the architecture in `report`, using whatever simulation and
    /// optimization context it carries.
    pub async fn explain_system(
        &self,
        report: SystemReport,
    ) -> std::result::Result<StageOutcome, StageFailure> {
        self.run(&Step::Explain, report).await
    }

    async fn execute(&self, step: &Step, report: &SystemReport) -> Result<StageOutcome> {
        let stage = step.stage();
        if report.has_completed(stage) {
            return Err(StageError::AlreadyCompleted { stage });
        }

        let base = PromptInput::from_report(report);
        let input = match step {
            Step::Analyze { intent } => base.with_intent(intent),
            Step::Optimize { objectives } => base.with_objectives(objectives),
            _ => base,
        };
        let prompt = prompt::compile(stage, &input)?;
        let prompt_digest = obs::digest(&prompt);
        obs::emit_stage_started(stage, &prompt_digest, prompt.len());
        let started = Instant::now();

        let raw = self.client.invoke(&prompt).await?;

        let mut next = report.clone();
        let mut warnings = Vec::new();
        // Warnings raised here rather than inside the normalizer.
        let mut local = Vec::new();
        match step {
            Step::Analyze { .. } => {
                let normalized = normalize::<IntentAnalysis>(&raw)?;
                warnings.extend(normalized.warnings);
                next.intent = Some(normalized.value);
            }
            Step::Generate => {
                let normalized = normalize::<SystemArchitecture>(&raw)?;
                warnings.extend(normalized.warnings);
                let repaired = graph::repair(normalized.value, stage);
                let graph = graph::build(&repaired.architecture)?;
                local.extend(repaired.warnings);
                next.architecture = Some(repaired.architecture);
                next.graph = Some(graph);
            }
            Step::Simulate => {
                let arch = require_architecture(report, stage)?;
                let normalized = normalize::<FailureSimulation>(&raw)?;
                warnings.extend(normalized.warnings);
                next.simulation = Some(anchor_failure_points(normalized.value, arch, &mut local));
            }
            Step::Optimize { objectives } => {
                let normalized = normalize::<OptimizationResult>(&raw)?;
                warnings.extend(normalized.warnings);
                let mut result = normalized.value;
                if !result.objective.is_empty() && result.objective != *objectives {
                    local.push(Warning::new(
                        stage,
                        "objective",
                        format!(
                            "oracle answered for {}; pinned to requested {}",
                            result.objective, objectives
                        ),
                    ));
                }
                result.objective = objectives.clone();

                let repaired = graph::repair(result.optimized_architecture, stage);
                let graph = graph::build(&repaired.architecture)?;
                local.extend(repaired.warnings.into_iter().map(|mut w| {
                    w.field = format!("optimized_architecture.{}", w.field);
                    w
                }));
                result.optimized_architecture = repaired.architecture;
                next.optimization = Some(result);
                next.optimized_graph = Some(graph);
            }
            Step::Explain => {
                let arch = require_architecture(report, stage)?;
                let normalized = normalize::<Explanation>(&raw)?;
                warnings.extend(normalized.warnings);
                let mut explanation = normalized.value;
                pad_uncovered_rules(&mut explanation, arch, &mut local);
                next.explanation = Some(explanation);
            }
        }

        for warning in &local {
            obs::emit_field_recovered(warning);
        }
        warnings.extend(local);
        next.warnings.extend(warnings.iter().cloned());
        obs::emit_stage_completed(stage, started.elapsed().as_millis() as u64, warnings.len());

        Ok(StageOutcome {
            stage,
            report: next,
            warnings,
            prompt_digest,
        })
    }
}

fn require_architecture(report: &SystemReport, stage: Stage) -> Result<&SystemArchitecture> {
    report.architecture.as_ref().ok_or_else(|| {
        CompilationError::MissingInput {
            stage,
            field: "system architecture",
        }
        .into()
    })
}

/// Rewrite failure-point module references to ids where they resolve.
fn anchor_failure_points(
    mut sim: FailureSimulation,
    arch: &SystemArchitecture,
    warnings: &mut Vec<Warning>,
) -> FailureSimulation {
    for (idx, point) in sim.failure_points.iter_mut().enumerate() {
        match graph::resolve_module_id(arch, &point.module) {
            Some(id) => point.module = id,
            None => warnings.push(Warning::new(
                Stage::Simulate,
                format!("failure_points[{}].module", idx),
                format!("{} is not a module of the architecture", point.module),
            )),
        }
        for (a_idx, affected) in point.affected_modules.iter_mut().enumerate() {
            match graph::resolve_module_id(arch, affected) {
                Some(id) => *affected = id,
                None => warnings.push(Warning::new(
                    Stage::Simulate,
                    format!("failure_points[{}].affected_modules[{}]", idx, a_idx),
                    format!("{} is not a module of the architecture", affected),
                )),
            }
        }
        let before = point.affected_modules.len();
        let mut seen = HashSet::new();
        point.affected_modules.retain(|m| seen.insert(m.clone()));
        if point.affected_modules.len() < before {
            warnings.push(Warning::new(
                Stage::Simulate,
                format!("failure_points[{}].affected_modules", idx),
                "names and ids of the same module collapsed",
            ));
        }
    }
    sim
}

/// Add a placeholder for every decision rule no entry explains.
fn pad_uncovered_rules(
    explanation: &mut Explanation,
    arch: &SystemArchitecture,
    warnings: &mut Vec<Warning>,
) {
    for (idx, rule) in arch.decision_rules.iter().enumerate() {
        if explanation.covers_rule(idx, &rule.condition) {
            continue;
        }
        let reference = crate::domain::DecisionRule::reference(idx);
        warnings.push(Warning::new(
            Stage::Explain,
            "entries",
            format!("{} was not explained; placeholder added", reference),
        ));
        explanation.entries.push(ExplanationEntry {
            decision: reference,
            justification: "No justification was returned for this decision.".to_string(),
            confidence: rule.confidence,
            risk_level: rule.risk_level,
        });
    }
}
