//! Pipeline stage identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the intent-to-system pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Analyze,
    Generate,
    Simulate,
    Optimize,
    Explain,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Analyze,
        Stage::Generate,
        Stage::Simulate,
        Stage::Optimize,
        Stage::Explain,
    ];

    /// Short machine name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analyze => "ANALYZE",
            Stage::Generate => "GENERATE",
            Stage::Simulate => "SIMULATE",
            Stage::Optimize => "OPTIMIZE",
            Stage::Explain => "EXPLAIN",
        }
    }

    /// Human-readable operation name.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Analyze => "Analyze Intent",
            Stage::Generate => "Generate System",
            Stage::Simulate => "Simulate Failure",
            Stage::Optimize => "Optimize System",
            Stage::Explain => "Explain System",
        }
    }

    /// Marker line embedded in every prompt of this stage.
    pub fn marker(&self) -> &'static str {
        match self {
            Stage::Analyze => "TASK: ANALYZE_INTENT",
            Stage::Generate => "TASK: GENERATE_SYSTEM",
            Stage::Simulate => "TASK: SIMULATE_FAILURE",
            Stage::Optimize => "TASK: OPTIMIZE_SYSTEM",
            Stage::Explain => "TASK: EXPLAIN_SYSTEM",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analyze" | "analyse" | "analyze-intent" => Ok(Stage::Analyze),
            "generate" | "generate-system" => Ok(Stage::Generate),
            "simulate" | "simulate-failure" => Ok(Stage::Simulate),
            "optimize" | "optimise" | "optimize-system" => Ok(Stage::Optimize),
            "explain" | "explain-system" => Ok(Stage::Explain),
            other => Err(format!("unknown stage: {}", other)),
        }
    }
}
