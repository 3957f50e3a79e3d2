//! Graph building: architecture → node/edge model.
//!
//! [`build`] is strict and deterministic: the same architecture always
//! yields the same graph, one node per module in declaration order.
//! [`repair`] fixes what the oracle commonly gets wrong (missing or
//! repeated ids, edges naming modules instead of ids, dangling edges) and
//! reports each fix as a [`Warning`].

use crate::domain::{
    GraphEdge, GraphIntegrityError, GraphModel, GraphNode, Stage, SystemArchitecture, Warning,
};
use crate::obs;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};

/// Build the graph for `arch`.
///
/// Modules without an id get a synthetic one (`m{position}-{slug}`).
/// Edge endpoints resolve by id, then by case-insensitive module name.
pub fn build(arch: &SystemArchitecture) -> Result<GraphModel, GraphIntegrityError> {
    let ids = effective_ids(arch);

    let mut seen = HashSet::new();
    for id in &ids {
        if !seen.insert(id.as_str()) {
            return Err(GraphIntegrityError::DuplicateModuleId { id: id.clone() });
        }
    }

    let nodes = arch
        .modules
        .iter()
        .zip(&ids)
        .enumerate()
        .map(|(position, (module, id))| {
            let mut metadata = BTreeMap::new();
            metadata.insert("responsibility".to_string(), json!(module.responsibility));
            metadata.insert("inputs".to_string(), json!(module.inputs));
            metadata.insert("outputs".to_string(), json!(module.outputs));
            metadata.insert("position".to_string(), json!(position));
            GraphNode {
                id: id.clone(),
                label: module.name.clone(),
                metadata,
            }
        })
        .collect();

    let mut edges = Vec::with_capacity(arch.data_flow.len());
    for (edge_index, edge) in arch.data_flow.iter().enumerate() {
        let resolve = |reference: &str| {
            resolve_index(arch, &ids, reference).ok_or_else(|| {
                GraphIntegrityError::UnknownEndpoint {
                    edge_index,
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    missing: reference.to_string(),
                }
            })
        };
        let source = resolve(&edge.source)?;
        let target = resolve(&edge.target)?;
        edges.push(GraphEdge {
            source: ids[source].clone(),
            target: ids[target].clone(),
            label: edge.label.clone(),
        });
    }

    Ok(GraphModel { nodes, edges })
}

/// An architecture rewritten so that [`build`] cannot fail on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub architecture: SystemArchitecture,
    pub warnings: Vec<Warning>,
}

/// Normalize module ids and edge endpoints.
///
/// - empty ids become synthetic ids
/// - repeated ids get a `-2`, `-3`.. suffix
/// - edge endpoints given by name are rewritten to ids
/// - edges whose endpoints resolve to no module are dropped
///
/// Running `repair` on its own output changes nothing.
pub fn repair(mut arch: SystemArchitecture, stage: Stage) -> Repaired {
    let mut warnings = Vec::new();

    let original: Vec<String> = arch.modules.iter().map(|m| m.id.trim().to_string()).collect();
    let mut taken: HashSet<String> = HashSet::new();
    for (position, module) in arch.modules.iter_mut().enumerate() {
        let field = format!("modules[{}].id", position);
        let base = if original[position].is_empty() {
            let id = synthetic_id(position, &module.name);
            warnings.push(Warning::new(
                stage,
                field.clone(),
                format!("missing; assigned {}", id),
            ));
            id
        } else {
            original[position].clone()
        };
        let id = unique(&base, &taken);
        if id != base {
            warnings.push(Warning::new(
                stage,
                field,
                format!("duplicate id {}; renamed to {}", base, id),
            ));
        }
        taken.insert(id.clone());
        module.id = id;
    }

    let ids: Vec<String> = arch.modules.iter().map(|m| m.id.clone()).collect();
    let mut kept = Vec::with_capacity(arch.data_flow.len());
    for (edge_index, mut edge) in std::mem::take(&mut arch.data_flow).into_iter().enumerate() {
        let source = resolve_original(&arch, &original, &ids, &edge.source);
        let target = resolve_original(&arch, &original, &ids, &edge.target);
        match (source, target) {
            (Some(s), Some(t)) => {
                edge.source = ids[s].clone();
                edge.target = ids[t].clone();
                kept.push(edge);
            }
            (s, _) => {
                let missing = if s.is_none() { &edge.source } else { &edge.target };
                let reason = format!("unknown module {}", missing);
                obs::emit_edge_dropped(edge_index, &edge.source, &edge.target, &reason);
                warnings.push(Warning::new(
                    stage,
                    format!("data_flow[{}]", edge_index),
                    format!("{} -> {} dropped: {}", edge.source, edge.target, reason),
                ));
            }
        }
    }
    arch.data_flow = kept;

    Repaired {
        architecture: arch,
        warnings,
    }
}

/// Resolve a module reference to its id.
pub fn resolve_module_id(arch: &SystemArchitecture, reference: &str) -> Option<String> {
    let ids = effective_ids(arch);
    resolve_index(arch, &ids, reference).map(|i| ids[i].clone())
}

fn effective_ids(arch: &SystemArchitecture) -> Vec<String> {
    let explicit: HashSet<String> = arch
        .modules
        .iter()
        .map(|m| m.id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    let mut synthetic_taken = explicit.clone();
    arch.modules
        .iter()
        .enumerate()
        .map(|(position, module)| {
            let id = module.id.trim();
            if id.is_empty() {
                let id = unique(&synthetic_id(position, &module.name), &synthetic_taken);
                synthetic_taken.insert(id.clone());
                id
            } else {
                id.to_string()
            }
        })
        .collect()
}

fn resolve_index(arch: &SystemArchitecture, ids: &[String], reference: &str) -> Option<usize> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    ids.iter()
        .position(|id| id == reference)
        .or_else(|| {
            arch.modules
                .iter()
                .position(|m| m.name.trim().eq_ignore_ascii_case(reference))
        })
        .or_else(|| ids.iter().position(|id| id.eq_ignore_ascii_case(reference)))
}

// Edge references written before renaming point at the first module that
// carried the id, so match against the pre-repair ids first.
fn resolve_original(
    arch: &SystemArchitecture,
    original: &[String],
    ids: &[String],
    reference: &str,
) -> Option<usize> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    original
        .iter()
        .position(|id| !id.is_empty() && id == reference)
        .or_else(|| resolve_index(arch, ids, reference))
}

fn synthetic_id(position: usize, name: &str) -> String {
    format!("m{}-{}", position + 1, slug(name))
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "module".to_string()
    } else {
        trimmed.to_string()
    }
}

fn unique(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArchitectureModule, DataFlowEdge};

    fn module(id: &str, name: &str) -> ArchitectureModule {
        ArchitectureModule {
            id: id.to_string(),
            name: name.to_string(),
            responsibility: format!("{} duties", name),
            inputs: vec![],
            outputs: vec![],
        }
    }

    fn edge(source: &str, target: &str) -> DataFlowEdge {
        DataFlowEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: "data".to_string(),
        }
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("Upload Service (v2)"), "upload-service-v2");
        assert_eq!(slug("***"), "module");
    }

    #[test]
    fn build_assigns_synthetic_ids_and_resolves_names() {
        let arch = SystemArchitecture {
            modules: vec![module("", "Upload Service"), module("store", "Blob Store")],
            data_flow: vec![edge("upload service", "store")],
            decision_rules: vec![],
        };
        let graph = build(&arch).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "m1-upload-service");
        assert_eq!(graph.edges[0].source, "m1-upload-service");
        assert_eq!(graph.edges[0].target, "store");
        assert_eq!(graph.nodes[1].metadata["position"], json!(1));
    }

    #[test]
    fn build_rejects_duplicates_and_dangling_edges() {
        let dup = SystemArchitecture {
            modules: vec![module("a", "A"), module("a", "B")],
            ..Default::default()
        };
        assert_eq!(
            build(&dup),
            Err(GraphIntegrityError::DuplicateModuleId { id: "a".to_string() })
        );

        let dangling = SystemArchitecture {
            modules: vec![module("a", "A")],
            data_flow: vec![edge("a", "ghost")],
            ..Default::default()
        };
        match build(&dangling) {
            Err(GraphIntegrityError::UnknownEndpoint { edge_index, missing, .. }) => {
                assert_eq!(edge_index, 0);
                assert_eq!(missing, "ghost");
            }
            other => panic!("expected UnknownEndpoint, got {:?}", other),
        }
    }

    #[test]
    fn repair_renames_duplicates_and_drops_dangling_edges() {
        let arch = SystemArchitecture {
            modules: vec![module("api", "API"), module("api", "Admin API"), module("", "Cache")],
            data_flow: vec![edge("API", "cache"), edge("api", "nowhere")],
            decision_rules: vec![],
        };
        let repaired = repair(arch, Stage::Generate);
        let ids: Vec<&str> = repaired
            .architecture
            .modules
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["api", "api-2", "m3-cache"]);
        assert_eq!(repaired.architecture.data_flow.len(), 1);
        assert_eq!(repaired.architecture.data_flow[0].source, "api");
        assert_eq!(repaired.architecture.data_flow[0].target, "m3-cache");
        assert_eq!(repaired.warnings.len(), 3);

        let graph = build(&repaired.architecture).unwrap();
        assert_eq!(graph.nodes.len(), 3);
    }

    #[test]
    fn repair_is_idempotent() {
        let arch = SystemArchitecture {
            modules: vec![module("", "Gateway"), module("db", "DB")],
            data_flow: vec![edge("gateway", "db")],
            decision_rules: vec![],
        };
        let once = repair(arch, Stage::Generate);
        let twice = repair(once.architecture.clone(), Stage::Generate);
        assert_eq!(once.architecture, twice.architecture);
        assert!(twice.warnings.is_empty());
        assert_eq!(build(&once.architecture), build(&twice.architecture));
    }

    #[test]
    fn resolve_module_id_by_name() {
        let arch = SystemArchitecture {
            modules: vec![module("", "Thumbnailer")],
            ..Default::default()
        };
        assert_eq!(
            resolve_module_id(&arch, "THUMBNAILER").as_deref(),
            Some("m1-thumbnailer")
        );
        assert!(resolve_module_id(&arch, "other").is_none());
    }
}
