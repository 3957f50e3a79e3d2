//! Node/edge view over a [`SystemArchitecture`](crate::domain::SystemArchitecture).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Derived, read-only graph. Built by [`crate::graph::build`], never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Render as a Mermaid `flowchart LR` diagram.
    ///
    /// Mermaid node ids are positional (`n0`, `n1`..) so no module id can
    /// collide with another or with a Mermaid keyword. The module id is
    /// shown under the label. Edges whose endpoints are not nodes are left
    /// out.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart LR\n");
        for (idx, node) in self.nodes.iter().enumerate() {
            out.push_str(&format!(
                "    n{}[\"{}<br/>{}\"]\n",
                idx,
                mermaid_text(&node.label),
                mermaid_text(&node.id)
            ));
        }
        let position = |id: &str| self.nodes.iter().position(|n| n.id == id);
        for edge in &self.edges {
            let (Some(source), Some(target)) = (position(&edge.source), position(&edge.target))
            else {
                continue;
            };
            if edge.label.is_empty() {
                out.push_str(&format!("    n{} --> n{}\n", source, target));
            } else {
                out.push_str(&format!(
                    "    n{} -->|\"{}\"| n{}\n",
                    source,
                    mermaid_text(&edge.label),
                    target
                ));
            }
        }
        out
    }
}

fn mermaid_text(text: &str) -> String {
    text.replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mermaid_render_is_stable() {
        let graph = GraphModel {
            nodes: vec![
                GraphNode {
                    id: "upload-svc".to_string(),
                    label: "Upload \"Service\"".to_string(),
                    metadata: BTreeMap::new(),
                },
                GraphNode {
                    id: "share".to_string(),
                    label: "Sharing".to_string(),
                    metadata: BTreeMap::new(),
                },
            ],
            edges: vec![GraphEdge {
                source: "upload-svc".to_string(),
                target: "share".to_string(),
                label: "photo ids".to_string(),
            }],
        };
        let expected = "flowchart LR\n    n0[\"Upload 'Service'<br/>upload-svc\"]\n    n1[\"Sharing<br/>share\"]\n    n0 -->|\"photo ids\"| n1\n";
        assert_eq!(graph.to_mermaid(), expected);
    }

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn similar_ids_stay_distinct_nodes() {
        let graph = GraphModel {
            nodes: vec![node("upload-svc"), node("upload_svc"), node("end")],
            edges: vec![
                GraphEdge {
                    source: "upload_svc".to_string(),
                    target: "end".to_string(),
                    label: String::new(),
                },
                GraphEdge {
                    source: "upload-svc".to_string(),
                    target: "ghost".to_string(),
                    label: String::new(),
                },
            ],
        };
        let mermaid = graph.to_mermaid();
        assert!(mermaid.contains("n0[\"upload-svc<br/>upload-svc\"]"));
        assert!(mermaid.contains("n1[\"upload_svc<br/>upload_svc\"]"));
        assert!(mermaid.contains("    n1 --> n2\n"));
        assert!(!mermaid.contains("ghost"));
        assert!(!mermaid.lines().any(|l| l.trim_start().starts_with("end")));
    }
}
