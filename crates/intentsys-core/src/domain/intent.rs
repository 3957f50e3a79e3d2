//! Structured decomposition of a user's intent.

use serde::{Deserialize, Serialize};

/// Goals, constraints, actors and success metrics extracted from intent text.
///
/// `constraints` and `actors` are sets; they are kept as deduplicated
/// sequences so prompts built from them stay byte-stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IntentAnalysis {
    pub goals: Vec<String>,
    pub constraints: Vec<String>,
    pub actors: Vec<String>,
    pub success_metrics: Vec<String>,
}

impl IntentAnalysis {
    /// Check the invariants a successful analysis must hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.goals.is_empty() {
            return Err("goals must not be empty".to_string());
        }
        let lists = [
            ("goals", &self.goals),
            ("constraints", &self.constraints),
            ("actors", &self.actors),
            ("success_metrics", &self.success_metrics),
        ];
        for (field, items) in lists {
            if items.iter().any(|s| s.trim().is_empty()) {
                return Err(format!("{} contains a blank entry", field));
            }
        }
        for (field, items) in [("constraints", &self.constraints), ("actors", &self.actors)] {
            if has_duplicates(items) {
                return Err(format!("{} contains duplicates", field));
            }
        }
        Ok(())
    }
}

fn has_duplicates(items: &[String]) -> bool {
    let mut seen = std::collections::HashSet::new();
    items.iter().any(|s| !seen.insert(s.as_str()))
}
