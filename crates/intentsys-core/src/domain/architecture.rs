//! System architecture: modules, data-flow edges and decision rules.

use crate::domain::risk::{Confidence, RiskLevel};
use serde::{Deserialize, Serialize};

/// A single module of the synthesized system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchitectureModule {
    /// Unique within an architecture. May be empty straight out of the
    /// normalizer; the graph builder assigns a synthetic one.
    pub id: String,
    pub name: String,
    pub responsibility: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Directed data/control flow between two modules, by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataFlowEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// A condition → action rule the architecture applies at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRule {
    pub condition: String,
    pub action: String,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
}

impl DecisionRule {
    /// Stable reference used by prompts and explanations (`R1`, `R2`, ...).
    pub fn reference(index: usize) -> String {
        format!("R{}", index + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SystemArchitecture {
    pub modules: Vec<ArchitectureModule>,
    pub data_flow: Vec<DataFlowEdge>,
    pub decision_rules: Vec<DecisionRule>,
}

impl SystemArchitecture {
    /// Find a module by exact id, then by case-insensitive name.
    pub fn resolve_module(&self, reference: &str) -> Option<&ArchitectureModule> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        self.modules
            .iter()
            .find(|m| !m.id.is_empty() && m.id == reference)
            .or_else(|| {
                self.modules
                    .iter()
                    .find(|m| m.name.trim().eq_ignore_ascii_case(reference))
            })
    }

    pub fn contains_module_id(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id == id)
    }

    /// Check structural invariants: non-empty unique ids and edges that
    /// point at declared modules.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for (idx, module) in self.modules.iter().enumerate() {
            if module.id.trim().is_empty() {
                return Err(format!("module #{} has no id", idx + 1));
            }
            if !seen.insert(module.id.as_str()) {
                return Err(format!("duplicate module id: {}", module.id));
            }
        }
        for edge in &self.data_flow {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(format!(
                        "edge {} -> {} references unknown module {}",
                        edge.source, edge.target, endpoint
                    ));
                }
            }
        }
        Ok(())
    }
}
