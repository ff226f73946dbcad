//! Roadmap graph model with lenient JSON parsing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A 2-D canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the canvas center.
    pub x: f64,
    /// Vertical offset from the top.
    pub y: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The kind of a roadmap node. Unrecognized kinds are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// Prerequisites and basics.
    Foundation,
    /// Core skills.
    Core,
    /// Advanced topics.
    Advanced,
    /// Hands-on project.
    Project,
    /// Checkpoint.
    Milestone,
    /// Any other label.
    Other(String),
}

impl NodeKind {
    /// The wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Foundation => "foundation",
            Self::Core => "core",
            Self::Advanced => "advanced",
            Self::Project => "project",
            Self::Milestone => "milestone",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for NodeKind {
    fn from(label: &str) -> Self {
        match label {
            "foundation" => Self::Foundation,
            "core" => Self::Core,
            "advanced" => Self::Advanced,
            "project" => Self::Project,
            "milestone" => Self::Milestone,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learning step on the roadmap.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoadmapNode {
    /// Unique id; empty until layout normalizes it.
    pub id: String,
    /// Node kind.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// Canvas position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Every other field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoadmapNode {
    /// Creates a node with an id and kind.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let mut extra = value.as_object()?.clone();
        let id = extra.remove("id").and_then(scalar_string).unwrap_or_default();
        let kind = extra
            .remove("type")
            .and_then(|v| v.as_str().map(NodeKind::from));
        let position = extra
            .remove("position")
            .and_then(|v| serde_json::from_value(v).ok());
        Some(Self {
            id,
            kind,
            position,
            extra,
        })
    }
}

/// A dependency between two nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoadmapEdge {
    /// Edge id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Source node id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Target node id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Every other field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoadmapEdge {
    /// Creates an edge between two node ids.
    #[must_use]
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            ..Self::default()
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let mut extra = value.as_object()?.clone();
        Some(Self {
            id: extra.remove("id").and_then(scalar_string),
            source: extra.remove("source").and_then(scalar_string),
            target: extra.remove("target").and_then(scalar_string),
            extra,
        })
    }
}

/// A roadmap: nodes, edges and opaque phases.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoadmapGraph {
    /// Learning steps.
    pub nodes: Vec<RoadmapNode>,
    /// Dependencies.
    pub edges: Vec<RoadmapEdge>,
    /// Phase descriptions, passed through untouched.
    pub phases: Vec<Value>,
    /// Every other top-level field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoadmapGraph {
    /// Builds a graph from arbitrary JSON.
    ///
    /// Never fails: a non-object yields an empty graph, non-object list
    /// entries are skipped, and ill-typed fields are treated as absent.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let mut extra = object.clone();
        let nodes = take_list(&mut extra, "nodes")
            .iter()
            .filter_map(RoadmapNode::from_value)
            .collect();
        let edges = take_list(&mut extra, "edges")
            .iter()
            .filter_map(RoadmapEdge::from_value)
            .collect();
        let phases = take_list(&mut extra, "phases");
        Self {
            nodes,
            edges,
            phases,
            extra,
        }
    }

    /// Builds a graph from a JSON map.
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self::from_value(&Value::Object(map.clone()))
    }

    /// Serializes the graph back to JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// One-line description used in prompts.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Roadmap contains {} learning nodes across {} phases.",
            self.nodes.len(),
            self.phases.len()
        )
    }

    /// Index of the node with `id`, if any.
    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_known_fields() {
        let graph = RoadmapGraph::from_value(&json!({
            "nodes": [
                {"id": "a", "type": "foundation", "position": {"x": 10, "y": 20}, "title": "Basics"},
                {"id": 7, "type": "capstone"}
            ],
            "edges": [{"id": "e1", "source": "a", "target": "7", "label": "next"}],
            "phases": [{"name": "Foundation"}],
            "theme": "dark"
        }));

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].kind, Some(NodeKind::Foundation));
        assert_eq!(graph.nodes[0].position, Some(Position::new(10.0, 20.0)));
        assert_eq!(graph.nodes[0].extra["title"], json!("Basics"));
        assert_eq!(graph.nodes[1].id, "7");
        assert_eq!(graph.nodes[1].kind, Some(NodeKind::Other("capstone".into())));
        assert_eq!(graph.edges[0].target.as_deref(), Some("7"));
        assert_eq!(graph.edges[0].extra["label"], json!("next"));
        assert_eq!(graph.phases.len(), 1);
        assert_eq!(graph.extra["theme"], json!("dark"));
    }

    #[test]
    fn test_from_value_is_lenient() {
        let graph = RoadmapGraph::from_value(&json!({
            "nodes": [{"id": "a", "position": "top left", "type": 3}, "junk", null],
            "edges": {"not": "a list"},
            "phases": "none"
        }));
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].position, None);
        assert_eq!(graph.nodes[0].kind, None);
        assert!(graph.edges.is_empty());
        assert!(graph.phases.is_empty());

        assert_eq!(RoadmapGraph::from_value(&json!([1, 2])), RoadmapGraph::default());
    }

    #[test]
    fn test_to_value_preserves_unknown_fields() {
        let input = json!({
            "nodes": [{"id": "a", "type": "core", "position": {"x": 0.0, "y": 100.0}, "title": "T"}],
            "edges": [{"id": "e", "source": "a", "target": "b", "animated": true}],
            "phases": [],
            "version": 2
        });
        let graph = RoadmapGraph::from_value(&input);
        assert_eq!(graph.to_value(), input);
    }

    #[test]
    fn test_summary() {
        let graph = RoadmapGraph {
            nodes: vec![RoadmapNode::new("a", NodeKind::Core), RoadmapNode::new("b", NodeKind::Core)],
            phases: vec![json!("p1")],
            ..RoadmapGraph::default()
        };
        assert_eq!(graph.summary(), "Roadmap contains 2 learning nodes across 1 phases.");
    }
}
