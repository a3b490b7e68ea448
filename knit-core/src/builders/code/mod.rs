//! Symbol resolution: turns import metadata on code nodes into `imports`
//! edges and links files to the symbols they define with `contains` edges.
//!
//! Unresolved imports never fail the run; they become diagnostics.

mod index;
pub mod paths;

pub use index::CodeIndex;

use serde_json::Value;
use tracing::{debug, info};

use super::{AssemblyOutput, Builder, Built};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::model::{Dataset, Edge, Graph, GraphNode, Node};
use crate::ontology::{attr, class, predicate};

/// One `{module, name, level}` record from `meta:imports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord<'a> {
    pub module: &'a str,
    pub name: Option<&'a str>,
    /// 0 for absolute imports, number of leading dots otherwise
    pub level: u64,
}

/// Relative levels beyond this are described by number, not by dots.
const MAX_DOTS: u64 = 16;

impl<'a> ImportRecord<'a> {
    /// Read a record; `Ok(None)` for non-objects and for absolute imports
    /// without a module, `Err` with a reason when `level` is not a
    /// non-negative integer.
    pub fn from_value(value: &'a Value) -> std::result::Result<Option<Self>, String> {
        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        let module = obj.get("module").and_then(Value::as_str).unwrap_or("");
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty());
        let level = parse_level(obj.get("level"))?;

        if module.is_empty() && level == 0 {
            return Ok(None);
        }
        Ok(Some(Self { module, name, level }))
    }

    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    fn describe(&self) -> String {
        let dots = if self.level <= MAX_DOTS {
            ".".repeat(self.level as usize)
        } else {
            format!("(level {}) ", self.level)
        };
        match self.name {
            Some(name) => format!("from {}{} import {}", dots, self.module, name),
            None => format!("import {}{}", dots, self.module),
        }
    }
}

/// Missing or null is 0; integral floats such as `1.0` are accepted.
fn parse_level(value: Option<&Value>) -> std::result::Result<u64, String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(0);
    };
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| format!("invalid import level {}", value))
}

/// How loudly a resolver reports misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reporting {
    /// Misses logged at debug; only unresolved modules become diagnostics.
    Quiet,
    /// Misses logged at info; symbol misses are diagnosed too.
    Verbose,
}

impl Reporting {
    fn log_miss(self, message: &str) {
        match self {
            Reporting::Quiet => debug!("{}", message),
            Reporting::Verbose => info!("{}", message),
        }
    }
}

/// Resolve every import in `input` against an index of the same input.
fn resolve(input: &Dataset, reporting: Reporting) -> Built {
    let index = CodeIndex::build(&input.nodes);
    info!(
        "Indexed {} code nodes: {} file keys, {} symbols",
        input.nodes.len(),
        index.file_key_count(),
        index.symbol_count()
    );

    let mut graph = Graph::new();
    for node in &input.nodes {
        graph.add_node(GraphNode::from(node));
    }

    let mut diagnostics = Vec::new();
    for node in &input.nodes {
        link_container(node, &index, &mut graph);
        link_imports(node, &index, reporting, &mut graph, &mut diagnostics);
    }

    info!(
        "Resolved {} edges with {} diagnostics",
        graph.edge_count(),
        diagnostics.len()
    );

    let export = graph.into_export(input.metadata.clone());
    Built::new(AssemblyOutput::Graph(export)).with_diagnostics(diagnostics)
}

/// `file -contains-> node` for every non-file node whose path names an
/// indexed file.
fn link_container(node: &Node, index: &CodeIndex, graph: &mut Graph) {
    if node.class == class::FILE {
        return;
    }
    let Some(path) = node.attr_str(attr::FILE_PATH).filter(|p| !p.is_empty()) else {
        return;
    };
    if let Some(file_id) = index.file(&paths::normalize(path)) {
        graph.add_edge(Edge::forward(file_id, &node.id, predicate::CONTAINS));
    }
}

fn link_imports(
    node: &Node,
    index: &CodeIndex,
    reporting: Reporting,
    graph: &mut Graph,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(Value::Array(imports)) = node.attributes.get(attr::IMPORTS) else {
        return;
    };
    if imports.is_empty() {
        return;
    }
    let Some(src_path) = node.first_attr_str(&[attr::FILE_PATH, attr::SOURCE]) else {
        return;
    };
    let src_path = paths::normalize(src_path);
    let src_dir = paths::parent_dir(&src_path);

    for value in imports {
        let import = match ImportRecord::from_value(value) {
            Ok(Some(import)) => import,
            Ok(None) => continue,
            Err(reason) => {
                reporting.log_miss(&format!("Malformed import in {}: {}", src_path, reason));
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedImport,
                    node.id.clone(),
                    reason,
                ));
                continue;
            }
        };
        let resolved = if import.is_relative() {
            index.resolve_relative(src_dir, import.level, import.module)
        } else {
            index.resolve_absolute(import.module).map(str::to_string)
        };

        let Some(file_key) = resolved else {
            reporting.log_miss(&format!(
                "Unresolved import in {}: '{}' (level {}, dir '{}')",
                src_path, import.module, import.level, src_dir
            ));
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedImport,
                node.id.clone(),
                format!("{}: no indexed file matches", import.describe()),
            ));
            continue;
        };

        let symbol = import.name.and_then(|name| index.symbol(&file_key, name));
        if let (Some(name), None) = (import.name, symbol) {
            let available = index.symbols_in(&file_key);
            reporting.log_miss(&format!(
                "Symbol '{}' not found in {} (imported by {}); available: [{}]",
                name,
                file_key,
                src_path,
                available.join(", ")
            ));
            if reporting == Reporting::Verbose {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MissingSymbol,
                    node.id.clone(),
                    format!(
                        "'{}' not defined in {}; available: [{}]",
                        name,
                        file_key,
                        available.join(", ")
                    ),
                ));
            }
        }

        let Some(target) = symbol.or_else(|| index.file(&file_key)) else {
            continue;
        };
        if target != node.id {
            graph.add_edge(Edge::forward(&node.id, target, predicate::IMPORTS));
        }
    }
}

fn has_located_code(input: &Dataset) -> bool {
    input.nodes.iter().any(|n| {
        class::is_code(&n.class) && n.attr_str(attr::FILE_PATH).is_some_and(|p| !p.is_empty())
    })
}

/// Code graph builder: `contains` and `imports` edges between code nodes.
#[derive(Debug, Clone, Default)]
pub struct CodeGraphBuilder;

impl CodeGraphBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Builder for CodeGraphBuilder {
    fn name(&self) -> &'static str {
        "code_graph"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["code_graph"]
    }

    fn can_handle(&self, input: &Dataset, _strategy: &str) -> Result<f64> {
        Ok(if has_located_code(input) { 1.0 } else { 0.0 })
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        Ok(resolve(input, Reporting::Quiet))
    }
}

/// Diagnostic variant of [`CodeGraphBuilder`]: same edges, but every symbol
/// miss is logged at info and reported with the symbols the file does define.
#[derive(Debug, Clone, Default)]
pub struct CodeStructureBuilder;

impl CodeStructureBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Builder for CodeStructureBuilder {
    fn name(&self) -> &'static str {
        "code_structure"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["code_structure"]
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        Ok(resolve(input, Reporting::Verbose))
    }
}
