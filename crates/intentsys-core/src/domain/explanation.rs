//! Explainability (XAI) entries justifying architectural decisions.

use crate::domain::risk::{Confidence, RiskLevel};
use serde::{Deserialize, Serialize};

/// Justification + confidence + risk attached to one decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplanationEntry {
    /// Decision reference (`R1`..) or a free-text decision name.
    pub decision: String,
    pub justification: String,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Explanation {
    #[serde(alias = "explanations")]
    pub entries: Vec<ExplanationEntry>,
}

impl Explanation {
    pub fn validate(&self) -> Result<(), String> {
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.decision.trim().is_empty() {
                return Err(format!("explanation #{} references no decision", idx + 1));
            }
        }
        Ok(())
    }

    /// Whether some entry explains the rule at `index` with the given condition.
    pub fn covers_rule(&self, index: usize, condition: &str) -> bool {
        let reference = crate::domain::DecisionRule::reference(index);
        self.entries.iter().any(|e| {
            let decision = e.decision.trim();
            decision.eq_ignore_ascii_case(&reference)
                || (!condition.trim().is_empty()
                    && decision.eq_ignore_ascii_case(condition.trim()))
        })
    }
}
