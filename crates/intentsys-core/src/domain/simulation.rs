//! Failure simulation results.

use crate::domain::risk::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailurePoint {
    /// Id of the failing module.
    pub module: String,
    pub impact: String,
    /// Ids of modules degraded by this failure.
    pub affected_modules: Vec<String>,
    pub mitigation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureSimulation {
    pub best_case: String,
    pub worst_case: String,
    pub failure_points: Vec<FailurePoint>,
    pub overall_risk: RiskLevel,
}

impl FailureSimulation {
    pub fn validate(&self) -> Result<(), String> {
        for (idx, fp) in self.failure_points.iter().enumerate() {
            if fp.module.trim().is_empty() {
                return Err(format!("failure point #{} names no module", idx + 1));
            }
        }
        Ok(())
    }
}
