//! Default linker: authored relationships become forward edges, each followed
//! by its synthesized reverse edge.
//!
//! Two variants share the algorithm and differ in how they treat targets that
//! are not part of the input:
//!
//! | builder            | strategy    | unknown target             |
//! |--------------------|-------------|----------------------------|
//! | [`GraphBuilder`]     | `graph`     | edge kept, diagnostic      |
//! | [`HierarchyBuilder`] | `hierarchy` | edge skipped, diagnostic   |

use std::collections::HashSet;
use tracing::debug;

use super::{AssemblyOutput, Builder, Built};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::model::{Dataset, Edge, Graph, GraphNode};
use crate::ontology::{qualify_like, split_qualified};

/// Default suffix for predicates without a rewrite rule.
pub const DEFAULT_REVERSE_SUFFIX: &str = "_REV";

/// Rewrite rules checked in order against the predicate's local name.
const REWRITE_RULES: &[(&str, &str)] = &[
    ("hasParent", "hasChild"),
    ("belongsTo", "contains"),
    ("next", "previous"),
];

/// Name of the reverse edge for `predicate`.
///
/// A predicate whose local name contains `hasParent`, `belongsTo` or `next`
/// maps to `hasChild`, `contains` or `previous` in the same namespace
/// (`knit` when unqualified). Anything else gets `suffix` appended.
pub fn reverse_predicate(predicate: &str, suffix: &str) -> String {
    let (_, local) = split_qualified(predicate);
    REWRITE_RULES
        .iter()
        .find(|(needle, _)| local.contains(needle))
        .map(|(_, reverse)| qualify_like(predicate, reverse))
        .unwrap_or_else(|| format!("{}{}", predicate, suffix))
}

/// Configuration shared by both linker variants.
#[derive(Debug, Clone)]
pub struct LinkerOptions {
    pub reverse_suffix: String,
}

impl Default for LinkerOptions {
    fn default() -> Self {
        Self {
            reverse_suffix: DEFAULT_REVERSE_SUFFIX.to_string(),
        }
    }
}

impl LinkerOptions {
    pub fn with_reverse_suffix(suffix: impl Into<String>) -> Self {
        Self {
            reverse_suffix: suffix.into(),
        }
    }
}

/// Whether edges to unknown targets are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DanglingPolicy {
    Keep,
    Skip,
}

fn link(input: &Dataset, options: &LinkerOptions, policy: DanglingPolicy) -> Built {
    let known: HashSet<&str> = input.nodes.iter().map(|n| n.id.as_str()).collect();

    let mut graph = Graph::new();
    for node in &input.nodes {
        graph.add_node(GraphNode::from(node));
    }

    let mut diagnostics = Vec::new();
    for node in &input.nodes {
        for (predicate, targets) in &node.relationships {
            let reverse = reverse_predicate(predicate, &options.reverse_suffix);
            for target in targets {
                if !known.contains(target.as_str()) {
                    let action = match policy {
                        DanglingPolicy::Keep => "kept",
                        DanglingPolicy::Skip => "skipped",
                    };
                    debug!("Dangling target {} -{}-> {} ({})", node.id, predicate, target, action);
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DanglingTarget,
                        node.id.clone(),
                        format!("'{}' target '{}' is not in the input ({})", predicate, target, action),
                    ));
                    if policy == DanglingPolicy::Skip {
                        continue;
                    }
                }
                graph.add_edge(Edge::forward(&node.id, target, predicate));
                graph.add_edge(Edge::reverse(target, &node.id, &reverse));
            }
        }
    }

    let export = graph.into_export(input.metadata.clone());
    Built::new(AssemblyOutput::Graph(export)).with_diagnostics(diagnostics)
}

/// Generic linker; edges to unknown targets are kept.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    options: LinkerOptions,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LinkerOptions) -> Self {
        Self { options }
    }
}

impl Builder for GraphBuilder {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["graph"]
    }

    fn can_handle(&self, _input: &Dataset, _strategy: &str) -> Result<f64> {
        Ok(0.9)
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        Ok(link(input, &self.options, DanglingPolicy::Keep))
    }
}

/// Hierarchical linker; edges to unknown targets are skipped.
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    options: LinkerOptions,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LinkerOptions) -> Self {
        Self { options }
    }
}

impl Builder for HierarchyBuilder {
    fn name(&self) -> &'static str {
        "hierarchy"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["hierarchy"]
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        Ok(link(input, &self.options, DanglingPolicy::Skip))
    }
}
