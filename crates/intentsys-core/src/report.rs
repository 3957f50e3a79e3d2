//! Report aggregation.
//!
//! [`SystemReport`] accumulates the outputs of completed stages. It is
//! only ever replaced by a new value, never patched in place by a stage
//! that failed. [`finalize`] turns it into the exportable form, omitting
//! stages that never ran.

use crate::domain::{
    Explanation, FailureSimulation, GraphModel, IntentAnalysis, OptimizationResult, Stage,
    SystemArchitecture, Warning,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version of the exported report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemReport {
    pub intent: Option<IntentAnalysis>,
    pub architecture: Option<SystemArchitecture>,
    pub graph: Option<GraphModel>,
    pub simulation: Option<FailureSimulation>,
    pub optimization: Option<OptimizationResult>,
    pub optimized_graph: Option<GraphModel>,
    pub explanation: Option<Explanation>,
    pub warnings: Vec<Warning>,
}

impl SystemReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a caller-supplied analysis.
    pub fn with_intent(mut self, analysis: IntentAnalysis) -> Self {
        self.intent = Some(analysis);
        self
    }

    /// Seed with a caller-supplied architecture.
    pub fn with_architecture(mut self, arch: SystemArchitecture) -> Self {
        self.architecture = Some(arch);
        self
    }

    pub fn with_simulation(mut self, simulation: FailureSimulation) -> Self {
        self.simulation = Some(simulation);
        self
    }

    pub fn with_optimization(mut self, optimization: OptimizationResult) -> Self {
        self.optimization = Some(optimization);
        self
    }

    /// Whether `stage`'s output is present.
    pub fn has_completed(&self, stage: Stage) -> bool {
        match stage {
            Stage::Analyze => self.intent.is_some(),
            Stage::Generate => self.architecture.is_some(),
            Stage::Simulate => self.simulation.is_some(),
            Stage::Optimize => self.optimization.is_some(),
            Stage::Explain => self.explanation.is_some(),
        }
    }

    /// Stages whose output is present, in pipeline order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| self.has_completed(*s))
            .collect()
    }

    pub fn warnings_for(&self, stage: Stage) -> impl Iterator<Item = &Warning> + '_ {
        self.warnings.iter().filter(move |w| w.stage == stage)
    }
}

/// Exportable view of a report. Absent stages are omitted, not nulled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportExport {
    pub schema_version: String,
    pub stages_completed: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<SystemArchitecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<FailureSimulation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_graph: Option<GraphModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Produce the exportable view of `report`.
pub fn finalize(report: &SystemReport) -> ReportExport {
    ReportExport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        stages_completed: report.completed_stages(),
        intent: report.intent.clone(),
        architecture: report.architecture.clone(),
        graph: report.graph.clone(),
        simulation: report.simulation.clone(),
        optimization: report.optimization.clone(),
        optimized_graph: report.optimized_graph.clone(),
        explanation: report.explanation.clone(),
        warnings: report.warnings.clone(),
    }
}

/// Reload an exported report so later stages can continue from it.
impl From<ReportExport> for SystemReport {
    fn from(export: ReportExport) -> Self {
        SystemReport {
            intent: export.intent,
            architecture: export.architecture,
            graph: export.graph,
            simulation: export.simulation,
            optimization: export.optimization,
            optimized_graph: export.optimized_graph,
            explanation: export.explanation,
            warnings: export.warnings,
        }
    }
}

/// Read a report previously written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<SystemReport> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let export: ReportExport =
        serde_json::from_str(&content).with_context(|| format!("parse report {:?}", path))?;
    Ok(export.into())
}

/// Write the export as pretty JSON.
pub fn write_report_json(path: &Path, export: &ReportExport) -> Result<()> {
    let content = serde_json::to_string_pretty(export).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a human-readable summary.
pub fn render_report_md(export: &ReportExport) -> String {
    let mut out = String::new();
    out.push_str("# System Report\n\n");
    let stages: Vec<&str> = export.stages_completed.iter().map(|s| s.name()).collect();
    out.push_str(&format!(
        "- stages completed: {}\n- warnings: {}\n\n",
        if stages.is_empty() {
            "none".to_string()
        } else {
            stages.join(", ")
        },
        export.warnings.len()
    ));

    if let Some(intent) = &export.intent {
        out.push_str("## Intent\n");
        push_list(&mut out, "Goals", &intent.goals);
        push_list(&mut out, "Constraints", &intent.constraints);
        push_list(&mut out, "Actors", &intent.actors);
        push_list(&mut out, "Success metrics", &intent.success_metrics);
    }

    if let Some(arch) = &export.architecture {
        out.push_str("## Architecture\n");
        for m in &arch.modules {
            out.push_str(&format!("- `{}` **{}**: {}\n", m.id, m.name, m.responsibility));
        }
        out.push('\n');
        if !arch.decision_rules.is_empty() {
            out.push_str("### Decision Rules\n");
            for (idx, r) in arch.decision_rules.iter().enumerate() {
                out.push_str(&format!(
                    "- {}: WHEN {} THEN {} ({}, risk {})\n",
                    crate::domain::DecisionRule::reference(idx),
                    r.condition,
                    r.action,
                    r.confidence,
                    r.risk_level
                ));
            }
            out.push('\n');
        }
    }

    if let Some(graph) = &export.graph {
        out.push_str("## Graph\n```mermaid\n");
        out.push_str(&graph.to_mermaid());
        out.push_str("```\n\n");
    }

    if let Some(sim) = &export.simulation {
        out.push_str(&format!("## Failure Simulation (overall risk {})\n", sim.overall_risk));
        out.push_str(&format!("- best case: {}\n- worst case: {}\n", sim.best_case, sim.worst_case));
        for fp in &sim.failure_points {
            out.push_str(&format!(
                "- `{}` fails: {} (mitigation: {})\n",
                fp.module, fp.impact, fp.mitigation
            ));
        }
        out.push('\n');
    }

    if let Some(opt) = &export.optimization {
        out.push_str(&format!("## Optimization ({})\n", opt.objective));
        out.push_str(&format!(
            "- modules after optimization: {}\n",
            opt.optimized_architecture.modules.len()
        ));
        push_list(&mut out, "Tradeoffs", &opt.tradeoffs);
    }

    if let Some(exp) = &export.explanation {
        out.push_str("## Explanation\n");
        for e in &exp.entries {
            out.push_str(&format!(
                "- {}: {} ({}, risk {})\n",
                e.decision, e.justification, e.confidence, e.risk_level
            ));
        }
        out.push('\n');
    }

    if !export.warnings.is_empty() {
        out.push_str("## Warnings\n");
        for w in &export.warnings {
            out.push_str(&format!("- {}\n", w));
        }
    }
    out
}

/// Write the Markdown summary.
pub fn write_report_md(path: &Path, export: &ReportExport) -> Result<()> {
    let md = render_report_md(export);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("### {}\n", title));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}
