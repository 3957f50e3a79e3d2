//! Prompt compilation.
//!
//! Every stage has a fixed template spelling out the exact JSON shape the
//! oracle must answer with: field names, enumerated values and numeric
//! ranges. Compilation is a pure function of `(stage, input)`; nothing
//! time- or randomness-dependent is ever embedded, so identical inputs
//! always yield byte-identical prompts.

use crate::domain::{
    CompilationError, DecisionRule, FailureSimulation, IntentAnalysis, ObjectiveSet,
    OptimizationResult, Stage, SystemArchitecture,
};
use crate::report::SystemReport;
use serde::Serialize;

/// Rules prepended to every prompt.
pub const JSON_GUARD: &str = "\
IMPORTANT RULES (ABSOLUTE):
- Respond with ONLY valid JSON
- No markdown
- No comments
- No explanations
- Output must start with '{' and end with '}'
- Do not include trailing commas";

const ANALYZE_SHAPE: &str = r#"{
  "goals": ["<short imperative goal>", "..."],
  "constraints": ["<constraint>", "..."],
  "actors": ["<actor>", "..."],
  "success_metrics": ["<measurable metric>", "..."]
}"#;

const ARCHITECTURE_SHAPE: &str = r#"{
  "modules": [
    {
      "id": "<kebab-case-id, unique>",
      "name": "<module name>",
      "responsibility": "<what the module does>",
      "inputs": ["<data label>"],
      "outputs": ["<data label>"]
    }
  ],
  "data_flow": [
    { "source": "<module id>", "target": "<module id>", "label": "<data label>" }
  ],
  "decision_rules": [
    {
      "condition": "<when this holds>",
      "action": "<the system does this>",
      "confidence": <number 0-100>,
      "risk_level": "LOW" | "MEDIUM" | "HIGH"
    }
  ]
}"#;

const SIMULATE_SHAPE: &str = r#"{
  "best_case": "<outcome when failures are contained>",
  "worst_case": "<outcome under cascading failure>",
  "failure_points": [
    {
      "module": "<module id>",
      "impact": "<what breaks>",
      "affected_modules": ["<module id>"],
      "mitigation": "<how to contain it>"
    }
  ],
  "overall_risk": "LOW" | "MEDIUM" | "HIGH"
}"#;

const EXPLAIN_SHAPE: &str = r#"{
  "explanations": [
    {
      "decision": "<decision reference, e.g. R1>",
      "justification": "<why this decision serves the goals>",
      "confidence": <number 0-100>,
      "risk_level": "LOW" | "MEDIUM" | "HIGH"
    }
  ]
}"#;

/// Typed material a prompt can be compiled from.
///
/// Each stage reads only the fields its template needs; a missing one is a
/// [`CompilationError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInput<'a> {
    pub intent: Option<&'a str>,
    pub analysis: Option<&'a IntentAnalysis>,
    pub architecture: Option<&'a SystemArchitecture>,
    pub objectives: Option<&'a ObjectiveSet>,
    pub simulation: Option<&'a FailureSimulation>,
    pub optimization: Option<&'a OptimizationResult>,
}

impl<'a> PromptInput<'a> {
    /// Input carrying every stage result present in `report`.
    pub fn from_report(report: &'a SystemReport) -> Self {
        PromptInput {
            intent: None,
            analysis: report.intent.as_ref(),
            architecture: report.architecture.as_ref(),
            objectives: None,
            simulation: report.simulation.as_ref(),
            optimization: report.optimization.as_ref(),
        }
    }

    pub fn with_intent(mut self, intent: &'a str) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_objectives(mut self, objectives: &'a ObjectiveSet) -> Self {
        self.objectives = Some(objectives);
        self
    }
}

/// Build the prompt for `stage` from `input`.
pub fn compile(stage: Stage, input: &PromptInput<'_>) -> Result<String, CompilationError> {
    let body = match stage {
        Stage::Analyze => {
            let intent = input
                .intent
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(CompilationError::MissingInput {
                    stage,
                    field: "intent text",
                })?;
            format!(
                "Decompose the intent below into goals, constraints, actors and success metrics.\n\
                 Goals are short imperative phrases (e.g. \"enable photo upload\").\n\
                 Constraints and actors must not repeat.\n\n\
                 Intent:\n{}\n\n\
                 Respond with JSON of exactly this shape:\n{}",
                intent, ANALYZE_SHAPE
            )
        }
        Stage::Generate => {
            let analysis = require(stage, input.analysis, "intent analysis")?;
            format!(
                "Design a modular system architecture that satisfies this intent analysis:\n\n{}\n\n\
                 Every data_flow source and target must be the id of a declared module.\n\
                 Give each decision rule a confidence between 0 and 100.\n\n\
                 Respond with JSON of exactly this shape:\n{}",
                encode(stage, "intent analysis", analysis)?,
                ARCHITECTURE_SHAPE
            )
        }
        Stage::Simulate => {
            let architecture = require(stage, input.architecture, "system architecture")?;
            format!(
                "Analyze failure modes for this system architecture:\n\n{}\n\n\
                 Reference modules only by their declared ids.\n\n\
                 Respond with JSON of exactly this shape:\n{}",
                encode(stage, "system architecture", architecture)?,
                SIMULATE_SHAPE
            )
        }
        Stage::Optimize => {
            let architecture = require(stage, input.architecture, "system architecture")?;
            let objectives = input
                .objectives
                .filter(|o| !o.is_empty())
                .ok_or(CompilationError::MissingInput {
                    stage,
                    field: "objective",
                })?;
            format!(
                "Optimize the following system for objective: {}\n\
                 Allowed objectives: RESILIENCE, COST, SPEED, FAIRNESS.\n\n\
                 System:\n{}\n\n\
                 Return the complete optimized architecture, not a diff, and state every\n\
                 tradeoff the changes introduce as a separate sentence.\n\n\
                 Respond with JSON of exactly this shape:\n{{\n  \"objective\": \"{}\",\n  \
                 \"optimized_architecture\": {},\n  \"tradeoffs\": [\"<tradeoff statement>\"]\n}}",
                objectives,
                encode(stage, "system architecture", architecture)?,
                objectives,
                indent(ARCHITECTURE_SHAPE, 2)
            )
        }
        Stage::Explain => {
            let architecture = require(stage, input.architecture, "system architecture")?;
            let mut context = format!(
                "Explain the architectural decisions of this system.\n\n\
                 Modules:\n{}\n\nDecision rules:\n{}",
                module_list(architecture),
                rule_list(architecture)
            );
            if let Some(analysis) = input.analysis {
                context.push_str(&format!("\n\nGoals:\n{}", bullet_list(&analysis.goals)));
            }
            if let Some(simulation) = input.simulation {
                context.push_str(&format!(
                    "\n\nFailure simulation (overall risk {}):\n{}",
                    simulation.overall_risk,
                    bullet_list(
                        &simulation
                            .failure_points
                            .iter()
                            .map(|fp| format!("{}: {}", fp.module, fp.impact))
                            .collect::<Vec<_>>()
                    )
                ));
            }
            if let Some(optimization) = input.optimization {
                context.push_str(&format!(
                    "\n\nOptimization for {} introduced these tradeoffs:\n{}",
                    optimization.objective,
                    bullet_list(&optimization.tradeoffs)
                ));
            }
            format!(
                "{}\n\n\
                 Provide one explanation per decision rule, referencing it by its id (R1, R2, ...).\n\n\
                 Respond with JSON of exactly this shape:\n{}",
                context, EXPLAIN_SHAPE
            )
        }
    };

    Ok(format!("{}\n\n{}\n\n{}", JSON_GUARD, stage.marker(), body))
}

fn require<'a, T>(
    stage: Stage,
    value: Option<&'a T>,
    field: &'static str,
) -> Result<&'a T, CompilationError> {
    value.ok_or(CompilationError::MissingInput { stage, field })
}

fn encode<T: Serialize>(stage: Stage, field: &'static str, value: &T) -> Result<String, CompilationError> {
    serde_json::to_string_pretty(value).map_err(|e| CompilationError::Encoding {
        stage,
        field,
        reason: e.to_string(),
    })
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .enumerate()
        .map(|(i, line)| if i == 0 { line.to_string() } else { format!("{}{}", pad, line) })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn module_list(architecture: &SystemArchitecture) -> String {
    bullet_list(
        &architecture
            .modules
            .iter()
            .map(|m| format!("{} ({}): {}", m.id, m.name, m.responsibility))
            .collect::<Vec<_>>(),
    )
}

fn rule_list(architecture: &SystemArchitecture) -> String {
    bullet_list(
        &architecture
            .decision_rules
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "{}: WHEN {} THEN {} (confidence {}, risk {})",
                    DecisionRule::reference(i),
                    r.condition,
                    r.action,
                    r.confidence.value(),
                    r.risk_level
                )
            })
            .collect::<Vec<_>>(),
    )
}
