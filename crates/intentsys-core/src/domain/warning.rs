use crate::domain::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A field-level defect that was recovered locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub stage: Stage,
    /// Dotted path of the affected field, e.g. `decision_rules[1].risk_level`.
    pub field: String,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, field: impl Into<String>, message: impl Into<String>) -> Self {
        Warning {
            stage,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.field, self.message)
    }
}
