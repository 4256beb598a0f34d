//! Graph-visible types: nodes, edges and the assembled graph.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized resource as it appears in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub attributes: Map<String, Value>,
    pub namespace: Option<String>,
}

/// Why an edge exists. Each resolver owns exactly one reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeReason {
    DependsOn,
    AttributeReference,
    SelectorMatch,
    IngressBackend,
    ConfigReference,
}

impl EdgeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeReason::DependsOn => "depends_on",
            EdgeReason::AttributeReference => "attribute_reference",
            EdgeReason::SelectorMatch => "selector_match",
            EdgeReason::IngressBackend => "ingress_backend",
            EdgeReason::ConfigReference => "config_reference",
        }
    }
}

impl fmt::Display for EdgeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed, reason-tagged relationship between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub reason: EdgeReason,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, reason: EdgeReason) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            reason,
        }
    }
}

/// The assembled dependency graph.
///
/// Nodes are an arena keyed by id; edges refer to ids only, so cyclic
/// dependencies need no shared ownership. Built once by the assembler and
/// not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub(crate) fn from_parts(nodes: BTreeMap<String, Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges tagged with `reason`.
    pub fn edges_with_reason(&self, reason: EdgeReason) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.reason == reason)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Serialize)]
struct GraphWire<'a> {
    nodes: Vec<&'a Node>,
    edges: &'a [Edge],
}

impl Serialize for Graph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        GraphWire {
            nodes: self.nodes.values().collect(),
            edges: &self.edges,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct GraphOwnedWire {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = GraphOwnedWire::deserialize(deserializer)?;
        let nodes = wire
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        Ok(Graph::from_parts(nodes, wire.edges))
    }
}
