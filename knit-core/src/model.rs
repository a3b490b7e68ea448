//! Graph data model.
//!
//! Input nodes carry forward-only relationship maps; builders turn them into a
//! [`Graph`] of [`GraphNode`]s and [`Edge`]s, which is exported as a
//! [`GraphExport`] for loaders downstream.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{AssemblyError, Result};
use crate::ontology::class;

/// Free-form attribute map attached to a node.
pub type Attributes = BTreeMap<String, Value>;

/// Pass-through metadata attached to a dataset.
pub type Metadata = BTreeMap<String, Value>;

/// A node as emitted by upstream adapters.
///
/// `relationships` maps a predicate to its ordered target ids. Only forward
/// references are authored; reverse edges are computed by the builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(alias = "node_id")]
    pub id: String,
    #[serde(
        alias = "node_class",
        default = "unknown_class",
        deserialize_with = "class_or_unknown"
    )]
    pub class: String,
    #[serde(
        default,
        alias = "friendly_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    #[serde(
        default,
        deserialize_with = "deserialize_relationships",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub relationships: IndexMap<String, Vec<String>>,
}

impl Node {
    /// Create a node with no attributes or relationships.
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            friendly_name: None,
            attributes: Attributes::new(),
            relationships: IndexMap::new(),
        }
    }

    /// Builder: set the display label.
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Builder: set an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: append a forward relationship.
    pub fn with_relation(mut self, predicate: impl Into<String>, target: impl Into<String>) -> Self {
        self.relationships
            .entry(predicate.into())
            .or_default()
            .push(target.into());
        self
    }

    /// String value of an attribute, if present and a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// First non-empty string among the given attribute keys.
    pub fn first_attr_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.attr_str(k))
            .find(|s| !s.is_empty())
    }
}

/// A node as held by a [`Graph`]: every field except the relationship map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl From<&Node> for GraphNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            class: node.class.clone(),
            friendly_name: node.friendly_name.clone(),
            attributes: node.attributes.clone(),
        }
    }
}

/// A directed, typed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub predicate: String,
    #[serde(default)]
    pub is_reverse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Attributes>,
}

impl Edge {
    /// Create an authored (forward) edge.
    pub fn forward(source: &str, target: &str, predicate: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            predicate: predicate.to_string(),
            is_reverse: false,
            properties: None,
        }
    }

    /// Create a synthesized (reverse) edge.
    pub fn reverse(source: &str, target: &str, predicate: &str) -> Self {
        Self {
            is_reverse: true,
            ..Self::forward(source, target, predicate)
        }
    }
}

/// In-memory graph produced by one assembly run.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: IndexMap<String, GraphNode>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; a later node with the same id replaces the earlier one.
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Append an edge.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
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

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            reverse_edge_count: self.edges.iter().filter(|e| e.is_reverse).count(),
        }
    }

    /// Consume the graph into its export form.
    pub fn into_export(self, metadata: Metadata) -> GraphExport {
        let stats = self.stats();
        GraphExport {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
            metadata,
            stats,
        }
    }
}

/// Node and edge counts reported with every graph export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub reverse_edge_count: usize,
}

/// Serialized graph: `{nodes, edges, metadata, stats}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub stats: GraphStats,
}

impl GraphExport {
    /// Find the edges leaving `source`.
    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == source)
    }
}

/// A batch of nodes handed to the assembler, plus pass-through metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub nodes: Vec<Node>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
}

impl Dataset {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            metadata: Metadata::new(),
        }
    }

    /// Interpret a raw payload as a dataset.
    ///
    /// Accepts either an object with a `nodes` array (and optional `metadata`)
    /// or a bare array of nodes.
    pub fn from_value(value: &Value) -> Result<Self> {
        let (raw_nodes, metadata) = match value {
            Value::Array(items) => (items.as_slice(), Metadata::new()),
            Value::Object(map) => {
                let nodes = match map.get("nodes") {
                    Some(Value::Array(items)) => items.as_slice(),
                    Some(other) => {
                        return Err(AssemblyError::shape(format!(
                            "'nodes' must be an array, got {}",
                            type_name(other)
                        )))
                    }
                    None => return Err(AssemblyError::shape("object payload has no 'nodes' field")),
                };
                let metadata = match map.get("metadata") {
                    None | Some(Value::Null) => Metadata::new(),
                    Some(Value::Object(meta)) => {
                        meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                    Some(other) => {
                        return Err(AssemblyError::shape(format!(
                            "'metadata' must be an object, got {}",
                            type_name(other)
                        )))
                    }
                };
                (nodes, metadata)
            }
            other => {
                return Err(AssemblyError::shape(format!(
                    "expected a node array or an object with 'nodes', got {}",
                    type_name(other)
                )))
            }
        };

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for (i, raw) in raw_nodes.iter().enumerate() {
            let node: Node = serde_json::from_value(raw.clone())
                .map_err(|e| AssemblyError::shape(format!("node #{}: {}", i, e)))?;
            if node.id.is_empty() {
                return Err(AssemblyError::shape(format!("node #{} has an empty id", i)));
            }
            nodes.push(node);
        }

        Ok(Self { nodes, metadata })
    }

    /// Parse a JSON document into a dataset.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Union of several datasets: nodes concatenated in order, metadata merged
    /// with later keys winning.
    pub fn merge<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> Self {
        let mut merged = Dataset::default();
        for ds in datasets {
            merged.nodes.extend(ds.nodes.iter().cloned());
            merged
                .metadata
                .extend(ds.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn unknown_class() -> String {
    class::UNKNOWN.to_string()
}

/// A missing or null class reads as [`class::UNKNOWN`].
fn class_or_unknown<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_class))
}

/// Relationship targets may be authored as a single id or a list of ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum Targets {
    One(String),
    Many(Vec<Option<String>>),
    Null(()),
}

fn deserialize_relationships<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Targets>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(predicate, targets)| {
            let ids = match targets {
                Targets::One(id) => vec![id],
                Targets::Many(ids) => ids.into_iter().flatten().collect(),
                Targets::Null(()) => Vec::new(),
            };
            (predicate, ids)
        })
        .collect())
}
