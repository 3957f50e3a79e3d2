//! Optimization objectives and results.

use crate::domain::architecture::SystemArchitecture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Objective {
    Resilience,
    Cost,
    Speed,
    Fairness,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Resilience => "RESILIENCE",
            Objective::Cost => "COST",
            Objective::Speed => "SPEED",
            Objective::Fairness => "FAIRNESS",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resilience" | "reliability" | "availability" => Ok(Objective::Resilience),
            "cost" | "price" | "efficiency" => Ok(Objective::Cost),
            "speed" | "latency" | "performance" => Ok(Objective::Speed),
            "fairness" | "equity" => Ok(Objective::Fairness),
            other => Err(format!("unknown objective: {}", other)),
        }
    }
}

/// One objective or a combination of them.
///
/// Serializes as a list; deserializes from a list or a `"SPEED+COST"` string.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ObjectiveSet(BTreeSet<Objective>);

impl<'de> Deserialize<'de> for ObjectiveSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(BTreeSet<Objective>),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::List(set) => Ok(ObjectiveSet(set)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl ObjectiveSet {
    pub fn single(objective: Objective) -> Self {
        ObjectiveSet(BTreeSet::from([objective]))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, objective: Objective) -> bool {
        self.0.contains(&objective)
    }

    pub fn iter(&self) -> impl Iterator<Item = Objective> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Objective> for ObjectiveSet {
    fn from_iter<I: IntoIterator<Item = Objective>>(iter: I) -> Self {
        ObjectiveSet(iter.into_iter().collect())
    }
}

impl fmt::Display for ObjectiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|o| o.as_str()).collect();
        f.write_str(&names.join("+"))
    }
}

/// Parses `"speed"`, `"SPEED+COST"`, `"speed, cost"` or `"speed and cost"`.
impl FromStr for ObjectiveSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(" and ", ",");
        let set = normalized
            .split(|c| matches!(c, '+' | ',' | '/' | '|' | '&'))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Objective::from_str)
            .collect::<Result<ObjectiveSet, _>>()?;
        if set.is_empty() {
            return Err("no objective given".to_string());
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationResult {
    pub objective: ObjectiveSet,
    pub optimized_architecture: SystemArchitecture,
    pub tradeoffs: Vec<String>,
}

impl OptimizationResult {
    pub fn validate(&self) -> Result<(), String> {
        if self.tradeoffs.iter().any(|t| t.trim().is_empty()) {
            return Err("tradeoffs contains a blank entry".to_string());
        }
        Ok(())
    }
}
