//! Property-graph projection of an analysis bundle
//!
//! Nodes and edges both carry typed key/value properties; the persistent
//! form in [`crate::storage`] serializes the property bags as JSON.

mod projection;

pub use projection::project_bundle;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed property values carried by nodes and edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for PropertyValue {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Properties collection; a BTreeMap keeps serialized output stable.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Node labels of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Novel,
    Chapter,
    Character,
    Event,
    Location,
    Emotion,
    State,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Novel => "Novel",
            NodeLabel::Chapter => "Chapter",
            NodeLabel::Character => "Character",
            NodeLabel::Event => "Event",
            NodeLabel::Location => "Location",
            NodeLabel::Emotion => "Emotion",
            NodeLabel::State => "State",
        }
    }
}

impl std::str::FromStr for NodeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Novel" => Ok(NodeLabel::Novel),
            "Chapter" => Ok(NodeLabel::Chapter),
            "Character" => Ok(NodeLabel::Character),
            "Event" => Ok(NodeLabel::Event),
            "Location" => Ok(NodeLabel::Location),
            "Emotion" => Ok(NodeLabel::Emotion),
            "State" => Ok(NodeLabel::State),
            other => Err(format!("unknown node label: {other}")),
        }
    }
}

/// A node in the projected graph. `id` is unique within one novel's
/// projection and deterministic across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: NodeLabel,
    pub properties: Properties,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: NodeLabel) -> Self {
        Self {
            id: id.into(),
            label,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed edge in the projected graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
    pub properties: Properties,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: relationship.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// The projected graph for one novel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort nodes and edges by their canonical keys so projections of
    /// equal bundles compare equal.
    pub fn normalize(&mut self) {
        self.nodes.sort_by(|a, b| (a.label, &a.id).cmp(&(b.label, &b.id)));
        self.edges.sort_by(|a, b| {
            (&a.relationship, &a.source, &a.target).cmp(&(&b.relationship, &b.source, &b.target))
        });
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_with_label(&self, label: NodeLabel) -> Vec<&GraphNode> {
        self.nodes.iter().filter(|n| n.label == label).collect()
    }

    pub fn edges_with_relationship(&self, relationship: &str) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.relationship == relationship)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_orders_nodes_and_edges() {
        let mut graph = PropertyGraph::new();
        graph.nodes.push(GraphNode::new("b", NodeLabel::Character));
        graph.nodes.push(GraphNode::new("a", NodeLabel::Character));
        graph.edges.push(GraphEdge::new("b", "a", "KNOWS"));
        graph.edges.push(GraphEdge::new("a", "b", "KNOWS"));
        graph.normalize();
        assert_eq!(graph.nodes[0].id, "a");
        assert_eq!(graph.edges[0].source, "a");
    }

    #[test]
    fn property_value_roundtrips_through_json() {
        let node = GraphNode::new("character:林远", NodeLabel::Character)
            .with_property("importance", 0.8)
            .with_property("mention_count", 12usize)
            .with_property(
                "aliases",
                PropertyValue::Array(vec!["林远".into(), "远儿".into()]),
            );
        let json = serde_json::to_string(&node.properties).unwrap();
        let back: Properties = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node.properties);
    }
}
