//! Domain-level description of a circuit, before it is flattened.
//!
//! Clusters are referred to by their position in [`CircuitInput::clusters`]
//! and nodes by their cluster plus their position in that cluster's entry or
//! exit list. Edges are directed and listed once, on their source node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Circle, Rectangle};
use crate::kind::NodeKind;

/// A whole circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitInput {
    pub clusters: Vec<ClusterInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterInput {
    /// Input index of the parent cluster; `None` for a root.
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<RectKeyframe>,
    #[serde(default)]
    pub entry_nodes: Vec<NodeInput>,
    #[serde(default)]
    pub exit_nodes: Vec<NodeInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeInput {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<CircleKeyframe>,
    /// Outgoing edges.
    #[serde(default)]
    pub edges: Vec<NodeRef>,
}

/// A territory moving linearly from `start` to `end` over
/// `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyframeInput<T> {
    pub start: T,
    pub end: T,
    pub start_time: f32,
    pub end_time: f32,
}

pub type RectKeyframe = KeyframeInput<Rectangle>;
pub type CircleKeyframe = KeyframeInput<Circle>;

impl<T> KeyframeInput<T> {
    pub fn new(start: T, end: T, start_time: f32, end_time: f32) -> Self {
        Self {
            start,
            end,
            start_time,
            end_time,
        }
    }
}

/// Address of a node in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub cluster: usize,
    pub node: usize,
}

impl NodeRef {
    pub fn entry(cluster: usize, node: usize) -> Self {
        Self {
            kind: NodeKind::Entry,
            cluster,
            node,
        }
    }

    pub fn exit(cluster: usize, node: usize) -> Self {
        Self {
            kind: NodeKind::Exit,
            cluster,
            node,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node {} of cluster {}", self.kind, self.node, self.cluster)
    }
}

/// A cluster or node, addressed in input coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputOwner {
    Cluster(usize),
    Node(NodeRef),
}

impl fmt::Display for InputOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputOwner::Cluster(index) => write!(f, "input cluster {index}"),
            InputOwner::Node(node) => write!(f, "input {node}"),
        }
    }
}

impl CircuitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Append a cluster and return its input index.
    pub fn add_cluster(&mut self, cluster: ClusterInput) -> usize {
        self.clusters.push(cluster);
        self.clusters.len() - 1
    }

    pub fn node(&self, node: NodeRef) -> Option<&NodeInput> {
        self.clusters.get(node.cluster)?.nodes(node.kind).get(node.node)
    }

    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.clusters.iter().map(|c| c.nodes(kind).len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.clusters
            .iter()
            .flat_map(|c| c.entry_nodes.iter().chain(&c.exit_nodes))
            .map(|n| n.edges.len())
            .sum()
    }
}

impl ClusterInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_keyframe(mut self, keyframe: RectKeyframe) -> Self {
        self.keyframes.push(keyframe);
        self
    }

    pub fn with_entry_node(mut self, node: NodeInput) -> Self {
        self.entry_nodes.push(node);
        self
    }

    pub fn with_exit_node(mut self, node: NodeInput) -> Self {
        self.exit_nodes.push(node);
        self
    }

    pub fn nodes(&self, kind: NodeKind) -> &[NodeInput] {
        match kind {
            NodeKind::Entry => &self.entry_nodes,
            NodeKind::Exit => &self.exit_nodes,
        }
    }
}

impl NodeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_keyframe(mut self, keyframe: CircleKeyframe) -> Self {
        self.keyframes.push(keyframe);
        self
    }

    pub fn with_edge(mut self, target: NodeRef) -> Self {
        self.edges.push(target);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector2;

    #[test]
    fn parses_minimal_json() {
        let input = CircuitInput::from_json_str(
            r#"{
                "clusters": [
                    { "entry_nodes": [ { "edges": [ { "kind": "exit", "cluster": 0, "node": 0 } ] } ],
                      "exit_nodes": [ { "label": "out" } ] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(input.clusters.len(), 1);
        assert_eq!(input.clusters[0].parent, None);
        assert_eq!(input.node(NodeRef::entry(0, 0)).unwrap().edges, vec![NodeRef::exit(0, 0)]);
        assert_eq!(
            input.node(NodeRef::exit(0, 0)).unwrap().label.as_deref(),
            Some("out")
        );
        assert!(input.node(NodeRef::exit(0, 1)).is_none());
        assert_eq!(input.edge_count(), 1);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(CircuitInput::from_json_str(r#"{ "clusters": [ { "colour": 1 } ] }"#).is_err());
    }

    #[test]
    fn builders_and_json_agree() {
        let mut input = CircuitInput::new();
        let root = input.add_cluster(ClusterInput::new().with_label("root"));
        input.add_cluster(
            ClusterInput::new().with_parent(root).with_entry_node(
                NodeInput::new().with_keyframe(KeyframeInput::new(
                    Circle::new(Vector2::new(0.0, 0.0), 1.0),
                    Circle::new(Vector2::new(1.0, 1.0), 2.0),
                    0.0,
                    1.0,
                )),
            ),
        );
        let json = input.to_json().unwrap();
        assert_eq!(CircuitInput::from_json_str(&json).unwrap(), input);
        assert_eq!(input.node_count(NodeKind::Entry), 1);
        assert_eq!(input.node_count(NodeKind::Exit), 0);
    }

    #[test]
    fn owners_display_input_coordinates() {
        assert_eq!(
            InputOwner::Node(NodeRef::exit(2, 1)).to_string(),
            "input exit node 1 of cluster 2"
        );
        assert_eq!(InputOwner::Cluster(4).to_string(), "input cluster 4");
    }
}
