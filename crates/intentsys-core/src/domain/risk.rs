//! Risk levels and confidence scores shared by decisions, failures and explanations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-level risk scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    /// Safe default when the oracle omits or garbles a risk level.
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Accepts the common synonyms models use for the three levels.
    pub fn parse_lenient(raw: &str) -> Option<RiskLevel> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "minimal" | "negligible" => Some(RiskLevel::Low),
            "medium" | "med" | "moderate" | "mid" => Some(RiskLevel::Medium),
            "high" | "critical" | "severe" | "major" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence score in the closed range 0–100.
///
/// Deserialization rejects out-of-range and non-finite values, so a strictly
/// parsed record can never carry an invalid score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;
    /// Used when the oracle omits a score.
    pub const DEFAULT: Confidence = Confidence(50.0);

    pub fn new(value: f64) -> Option<Confidence> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Some(Confidence(value))
        } else {
            None
        }
    }

    /// Clamp any finite value into range; NaN maps to the default.
    pub fn clamped(value: f64) -> Confidence {
        if value.is_nan() {
            return Self::DEFAULT;
        }
        Confidence(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| format!("confidence {} outside 0..=100", value))
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}
