//! Recovery rules for each stage's target record.

use super::fields::{
    as_text, confidence_field, dedup, lookup, optional_text, risk_field, text_field, text_list,
    Recovery,
};
use super::Schema;
use crate::domain::{
    ArchitectureModule, DataFlowEdge, DecisionRule, Explanation, ExplanationEntry,
    FailurePoint, FailureSimulation, IntentAnalysis, Objective, ObjectiveSet, OptimizationResult, Stage,
    SystemArchitecture,
};
use serde_json::{Map, Value};

impl Schema for IntentAnalysis {
    const STAGE: Stage = Stage::Analyze;
    const FIELDS: &'static [&'static str] = &[
        "goals",
        "objectives",
        "constraints",
        "actors",
        "stakeholders",
        "success_metrics",
        "metrics",
    ];

    fn check(&self) -> Result<(), String> {
        self.validate()
    }

    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String> {
        let goals = text_list(payload, &["goals", "objectives"], "goals", rec);
        if goals.is_empty() {
            return Err("no goals could be recovered".to_string());
        }
        let constraints = text_list(payload, &["constraints", "requirements"], "constraints", rec);
        let actors = text_list(payload, &["actors", "stakeholders", "users"], "actors", rec);
        let success_metrics = text_list(
            payload,
            &["success_metrics", "metrics", "kpis"],
            "success_metrics",
            rec,
        );

        Ok(IntentAnalysis {
            goals,
            constraints: dedup(constraints, "constraints", rec),
            actors: dedup(actors, "actors", rec),
            success_metrics,
        })
    }
}

impl Schema for SystemArchitecture {
    const STAGE: Stage = Stage::Generate;
    const FIELDS: &'static [&'static str] = &[
        "modules",
        "components",
        "data_flow",
        "data_flows",
        "edges",
        "decision_rules",
        "decisions",
    ];

    // Reference integrity belongs to the graph builder, which repairs or
    // rejects with its own error.
    fn check(&self) -> Result<(), String> {
        if self.modules.is_empty() {
            return Err("architecture declares no modules".to_string());
        }
        Ok(())
    }

    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String> {
        Ok(recover_architecture(payload, rec))
    }
}

pub(crate) fn recover_architecture(
    payload: &Map<String, Value>,
    rec: &mut Recovery,
) -> SystemArchitecture {
    let modules = match lookup(payload, &["modules", "components"]) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                rec.scoped(&format!("modules[{}]", idx), |rec| recover_module(item, idx, rec))
            })
            .collect(),
        Some(_) => {
            rec.warn("modules", "not a list; defaulted to an empty list");
            Vec::new()
        }
        None => {
            rec.warn("modules", "missing; defaulted to an empty list");
            Vec::new()
        }
    };

    let mut data_flow = Vec::new();
    match lookup(payload, &["data_flow", "data_flows", "edges", "flows"]) {
        Some(Value::Array(items)) => {
            for (idx, item) in items.iter().enumerate() {
                rec.scoped(&format!("data_flow[{}]", idx), |rec| {
                    data_flow.extend(recover_edges(item, rec))
                });
            }
        }
        Some(_) => rec.warn("data_flow", "not a list; defaulted to an empty list"),
        None => rec.warn("data_flow", "missing; defaulted to an empty list"),
    }

    let decision_rules = match lookup(payload, &["decision_rules", "decisions", "rules"]) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                rec.scoped(&format!("decision_rules[{}]", idx), |rec| recover_rule(item, rec))
            })
            .collect(),
        Some(_) => {
            rec.warn("decision_rules", "not a list; defaulted to an empty list");
            Vec::new()
        }
        None => {
            rec.warn("decision_rules", "missing; defaulted to an empty list");
            Vec::new()
        }
    };

    SystemArchitecture {
        modules,
        data_flow,
        decision_rules,
    }
}

fn recover_module(item: &Value, idx: usize, rec: &mut Recovery) -> Option<ArchitectureModule> {
    match item {
        Value::Object(obj) => {
            let id = optional_text(obj, &["id", "module_id", "key"]).unwrap_or_default();
            let name = match optional_text(obj, &["name", "title", "module"]) {
                Some(name) => name,
                None if !id.is_empty() => {
                    rec.warn("name", "missing; using the module id");
                    id.clone()
                }
                None => {
                    let fallback = format!("Module {}", idx + 1);
                    rec.warn("name", format!("missing; defaulted to {:?}", fallback));
                    fallback
                }
            };
            Some(ArchitectureModule {
                id,
                name,
                responsibility: text_field(
                    obj,
                    &["responsibility", "description", "purpose", "role"],
                    "responsibility",
                    "",
                    rec,
                ),
                inputs: text_list(obj, &["inputs", "input"], "inputs", rec),
                outputs: text_list(obj, &["outputs", "output"], "outputs", rec),
            })
        }
        other => match as_text(other) {
            Some(name) => {
                rec.warn("", "module given as bare text; fields defaulted");
                Some(ArchitectureModule {
                    id: String::new(),
                    name,
                    responsibility: String::new(),
                    inputs: Vec::new(),
                    outputs: Vec::new(),
                })
            }
            None => {
                rec.warn("", "module carries no usable data; dropped");
                None
            }
        },
    }
}

/// Edges from any of the data-flow shapes models emit.
///
/// Accepted: `{source,target,label}`, `{from,to,data}`,
/// `{flow_name, steps: ["A -> B -> C"]}` and bare `"A -> B"` chains.
fn recover_edges(item: &Value, rec: &mut Recovery) -> Vec<DataFlowEdge> {
    match item {
        Value::Object(obj) => {
            let source = optional_text(obj, &["source", "from", "source_module", "src"]);
            let target = optional_text(obj, &["target", "to", "target_module", "dst"]);
            if let (Some(source), Some(target)) = (source, target) {
                let label = match optional_text(obj, &["label", "data", "flow_name", "name", "description"]) {
                    Some(label) => label,
                    None => {
                        rec.warn("label", "missing; defaulted to \"data flow\"");
                        "data flow".to_string()
                    }
                };
                return vec![DataFlowEdge {
                    source,
                    target,
                    label,
                }];
            }

            if let Some(steps) = lookup(obj, &["steps", "path"]) {
                let label = optional_text(obj, &["flow_name", "label", "name"])
                    .unwrap_or_else(|| "data flow".to_string());
                let chains: Vec<String> = match steps {
                    Value::Array(items) => items.iter().filter_map(as_text).collect(),
                    other => as_text(other).into_iter().collect(),
                };
                rec.warn("", "flow given as step chains; expanded to edges");
                if chains.len() > 1 && chains.iter().all(|c| split_chain(c).len() == 1) {
                    // Steps listed one module per entry.
                    return chain_edges(&chains, &label);
                }
                return chains
                    .iter()
                    .flat_map(|c| chain_edges(&split_chain(c), &label))
                    .collect();
            }

            rec.warn("", "edge names no source and target; dropped");
            Vec::new()
        }
        other => match as_text(other) {
            Some(chain) => {
                let parts = split_chain(&chain);
                if parts.len() < 2 {
                    rec.warn("", format!("unrecognised edge {:?}; dropped", chain));
                    return Vec::new();
                }
                rec.warn("", "edge given as text; expanded");
                chain_edges(&parts, "data flow")
            }
            None => {
                rec.warn("", "edge carries no usable data; dropped");
                Vec::new()
            }
        },
    }
}

fn split_chain(chain: &str) -> Vec<String> {
    chain
        .replace('→', "->")
        .replace("=>", "->")
        .split("->")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn chain_edges(parts: &[String], label: &str) -> Vec<DataFlowEdge> {
    parts
        .windows(2)
        .map(|pair| DataFlowEdge {
            source: pair[0].clone(),
            target: pair[1].clone(),
            label: label.to_string(),
        })
        .collect()
}

fn recover_rule(item: &Value, rec: &mut Recovery) -> Option<DecisionRule> {
    let Value::Object(obj) = item else {
        return match as_text(item) {
            Some(condition) => {
                rec.warn("", "rule given as bare text; action and scores defaulted");
                Some(DecisionRule {
                    condition,
                    action: String::new(),
                    confidence: Default::default(),
                    risk_level: Default::default(),
                })
            }
            None => {
                rec.warn("", "rule carries no usable data; dropped");
                None
            }
        };
    };

    let condition = optional_text(obj, &["condition", "when", "trigger", "decision", "rule_name", "rule"]);
    let action = optional_text(obj, &["action", "then", "justification", "outcome"]);
    if condition.is_none() && action.is_none() {
        rec.warn("", "rule has neither condition nor action; dropped");
        return None;
    }
    let condition = condition.unwrap_or_else(|| {
        rec.warn("condition", "missing; defaulted to \"\"");
        String::new()
    });
    let action = action.unwrap_or_else(|| {
        rec.warn("action", "missing; defaulted to \"\"");
        String::new()
    });

    Some(DecisionRule {
        condition,
        action,
        confidence: confidence_field(obj, &["confidence", "confidence_score"], "confidence", rec),
        risk_level: risk_field(obj, &["risk_level", "risk", "severity"], "risk_level", rec),
    })
}

impl Schema for FailureSimulation {
    const STAGE: Stage = Stage::Simulate;
    const FIELDS: &'static [&'static str] = &[
        "best_case",
        "worst_case",
        "failure_points",
        "failures",
        "overall_risk",
        "risk_level",
    ];

    fn check(&self) -> Result<(), String> {
        self.validate()
    }

    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String> {
        let best_case = text_field(
            payload,
            &["best_case", "best_case_scenario"],
            "best_case",
            "",
            rec,
        );
        let worst_case = text_field(
            payload,
            &["worst_case", "worst_case_scenario"],
            "worst_case",
            "",
            rec,
        );

        let failure_points = match lookup(payload, &["failure_points", "failures", "failure_modes"]) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    rec.scoped(&format!("failure_points[{}]", idx), |rec| {
                        recover_failure_point(item, rec)
                    })
                })
                .collect(),
            Some(_) => {
                rec.warn("failure_points", "not a list; defaulted to an empty list");
                Vec::new()
            }
            None => {
                rec.warn("failure_points", "missing; defaulted to an empty list");
                Vec::new()
            }
        };

        Ok(FailureSimulation {
            best_case,
            worst_case,
            failure_points,
            overall_risk: risk_field(
                payload,
                &["overall_risk", "risk_level", "risk"],
                "overall_risk",
                rec,
            ),
        })
    }
}

fn recover_failure_point(item: &Value, rec: &mut Recovery) -> Option<FailurePoint> {
    let Value::Object(obj) = item else {
        rec.warn("", "failure point is not an object; dropped");
        return None;
    };
    let Some(module) = optional_text(obj, &["module", "module_id", "component", "point", "name", "id"]) else {
        rec.warn("module", "missing; failure point dropped");
        return None;
    };
    Some(FailurePoint {
        module,
        impact: text_field(obj, &["impact", "failure", "description", "effect"], "impact", "", rec),
        affected_modules: dedup(
            text_list(
                obj,
                &["affected_modules", "affected", "cascades_to"],
                "affected_modules",
                rec,
            ),
            "affected_modules",
            rec,
        ),
        mitigation: text_field(
            obj,
            &["mitigation", "mitigations", "remediation"],
            "mitigation",
            "",
            rec,
        ),
    })
}

impl Schema for OptimizationResult {
    const STAGE: Stage = Stage::Optimize;
    const FIELDS: &'static [&'static str] = &[
        "optimized_architecture",
        "architecture",
        "optimized_system",
        "tradeoffs",
        "trade_offs",
        "objective",
    ];

    fn check(&self) -> Result<(), String> {
        self.validate()?;
        self.optimized_architecture.check()
    }

    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String> {
        let Some(Value::Object(arch)) = lookup(
            payload,
            &["optimized_architecture", "architecture", "optimized_system"],
        ) else {
            return Err("no optimized architecture in response".to_string());
        };
        let optimized_architecture =
            rec.scoped("optimized_architecture", |rec| recover_architecture(arch, rec));

        let tradeoffs = match lookup(payload, &["tradeoffs", "trade_offs"]) {
            Some(Value::Array(items)) => items.iter().filter_map(as_text).collect(),
            Some(Value::Object(map)) => {
                rec.warn("tradeoffs", "given as a map; flattened to \"key: value\" entries");
                map.iter()
                    .filter_map(|(k, v)| as_text(v).map(|v| format!("{}: {}", k, v)))
                    .collect()
            }
            Some(other) => match as_text(other) {
                Some(text) => {
                    rec.warn("tradeoffs", "expected a list; wrapped single value");
                    vec![text]
                }
                None => {
                    rec.warn("tradeoffs", "not a list; defaulted to an empty list");
                    Vec::new()
                }
            },
            None => {
                rec.warn("tradeoffs", "missing; defaulted to an empty list");
                Vec::new()
            }
        };

        Ok(OptimizationResult {
            objective: recover_objective(payload),
            optimized_architecture,
            tradeoffs,
        })
    }
}

// The pipeline pins the requested objectives, so an unreadable echo is
// left empty rather than reported.
fn recover_objective(payload: &Map<String, Value>) -> ObjectiveSet {
    match lookup(payload, &["objective", "objectives"]) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(as_text)
            .filter_map(|s| s.parse::<Objective>().ok())
            .collect(),
        Some(other) => as_text(other)
            .and_then(|s| s.parse::<ObjectiveSet>().ok())
            .unwrap_or_default(),
        None => ObjectiveSet::default(),
    }
}

impl Schema for Explanation {
    const STAGE: Stage = Stage::Explain;
    const FIELDS: &'static [&'static str] = &["entries", "explanations", "explanation", "decisions"];

    fn check(&self) -> Result<(), String> {
        self.validate()
    }

    fn recover(payload: &Map<String, Value>, rec: &mut Recovery) -> Result<Self, String> {
        let entries = match lookup(payload, &["entries", "explanations", "explanation", "decisions"]) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    rec.scoped(&format!("entries[{}]", idx), |rec| recover_entry(item, idx, rec))
                })
                .collect(),
            Some(_) => {
                rec.warn("entries", "not a list; defaulted to an empty list");
                Vec::new()
            }
            None => {
                rec.warn("entries", "missing; defaulted to an empty list");
                Vec::new()
            }
        };
        Ok(Explanation { entries })
    }
}

fn recover_entry(item: &Value, idx: usize, rec: &mut Recovery) -> Option<ExplanationEntry> {
    let positional = DecisionRule::reference(idx);
    match item {
        Value::Object(obj) => {
            let decision = optional_text(
                obj,
                &["decision", "decision_ref", "reference", "rule", "decision_id", "id"],
            )
            .unwrap_or_else(|| {
                rec.warn("decision", format!("missing; assumed positional {}", positional));
                positional.clone()
            });
            Some(ExplanationEntry {
                decision,
                justification: text_field(
                    obj,
                    &["justification", "rationale", "explanation", "reason"],
                    "justification",
                    "",
                    rec,
                ),
                confidence: confidence_field(obj, &["confidence", "confidence_score"], "confidence", rec),
                risk_level: risk_field(obj, &["risk_level", "risk", "severity"], "risk_level", rec),
            })
        }
        other => match as_text(other) {
            Some(justification) => {
                rec.warn(
                    "",
                    format!("entry given as bare text; assigned to {} with default scores", positional),
                );
                Some(ExplanationEntry {
                    decision: positional,
                    justification,
                    confidence: Default::default(),
                    risk_level: Default::default(),
                })
            }
            None => {
                rec.warn("", "entry carries no usable data; dropped");
                None
            }
        },
    }
}
