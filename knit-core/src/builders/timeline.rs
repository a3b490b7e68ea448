//! Timeline builder: orders media segments within their parent and chains
//! them with `next` edges.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

use super::{AssemblyOutput, Builder, Built};
use crate::error::Result;
use crate::model::{Dataset, Edge, Graph, GraphNode, Node};
use crate::ontology::{attr, class, predicate};

/// Segment start time in seconds; missing or unparsable values count as 0.
fn start_time(node: &Node) -> f64 {
    match node.attributes.get(attr::START_TIME) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder;

impl TimelineBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Builder for TimelineBuilder {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["timeline"]
    }

    fn can_handle(&self, input: &Dataset, _strategy: &str) -> Result<f64> {
        let has_segments = input.nodes.iter().any(|n| n.class == class::VIDEO_SEGMENT);
        Ok(if has_segments { 1.0 } else { 0.0 })
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        let mut graph = Graph::new();
        let mut groups: IndexMap<&str, Vec<&Node>> = IndexMap::new();

        for node in &input.nodes {
            graph.add_node(GraphNode::from(node));
            if node.class != class::VIDEO_SEGMENT {
                continue;
            }
            if let Some(parent) = node.attr_str(attr::PARENT_NODE).filter(|p| !p.is_empty()) {
                groups.entry(parent).or_default().push(node);
            }
        }

        for (parent, segments) in groups.iter_mut() {
            segments.sort_by(|a, b| start_time(a).total_cmp(&start_time(b)));

            for (i, segment) in segments.iter().enumerate() {
                graph.add_edge(Edge::forward(parent, &segment.id, predicate::CONTAINS));
                if let Some(following) = segments.get(i + 1) {
                    graph.add_edge(Edge::forward(&segment.id, &following.id, predicate::NEXT));
                }
            }
        }

        info!(
            "Linked {} timelines with {} edges",
            groups.len(),
            graph.edge_count()
        );

        let export = graph.into_export(input.metadata.clone());
        Ok(Built::new(AssemblyOutput::Graph(export)))
    }
}
