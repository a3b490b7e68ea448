//! Query compiler: renders nodes and relationships as idempotent Cypher
//! `MERGE` statements.
//!
//! Node statements come first, then relationship statements, both in input
//! order. The same input always yields the same statements.

use serde_json::{Map, Value};
use std::fmt::Write;
use thiserror::Error;
use tracing::{info, warn};

use super::{AssemblyOutput, Builder, Built};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::model::{Attributes, Dataset, GraphExport};

/// Maximum nesting of lists and maps inside a property value.
pub const MAX_LITERAL_DEPTH: usize = 32;

/// Why a single statement could not be rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("empty label")]
    EmptyLabel,
    #[error("empty relationship type")]
    EmptyType,
    #[error("empty property key")]
    EmptyKey,
    #[error("value nested deeper than {0} levels")]
    TooDeep(usize),
}

type RenderResult<T> = std::result::Result<T, RenderError>;

/// Compiles graph data into Cypher statements.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    max_depth: usize,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self {
            max_depth: MAX_LITERAL_DEPTH,
        }
    }
}

/// Statements plus the items that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub statements: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compiled {
    fn push(&mut self, rendered: RenderResult<String>, node_id: &str, what: &str) {
        match rendered {
            Ok(statement) => self.statements.push(statement),
            Err(e) => {
                warn!("Skipping {} statement for '{}': {}", what, node_id, e);
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::SkippedStatement,
                    node_id,
                    format!("{} statement skipped: {}", what, e),
                ));
            }
        }
    }
}

impl QueryCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile nodes and their authored relationships.
    pub fn compile(&self, input: &Dataset) -> Compiled {
        let mut out = Compiled::default();
        for node in &input.nodes {
            let rendered = self.merge_node(
                &node.id,
                &node.class,
                node.friendly_name.as_deref(),
                &node.attributes,
            );
            out.push(rendered, &node.id, "node");
        }
        for node in &input.nodes {
            for (predicate, targets) in &node.relationships {
                for target in targets {
                    let rendered = self.merge_relationship(&node.id, target, predicate);
                    out.push(rendered, &node.id, "relationship");
                }
            }
        }
        out
    }

    /// Compile an already-linked graph; reverse edges are left out.
    pub fn compile_graph(&self, graph: &GraphExport) -> Compiled {
        let mut out = Compiled::default();
        for node in &graph.nodes {
            let rendered = self.merge_node(
                &node.id,
                &node.class,
                node.friendly_name.as_deref(),
                &node.attributes,
            );
            out.push(rendered, &node.id, "node");
        }
        for edge in graph.edges.iter().filter(|e| !e.is_reverse) {
            out.push(
                self.merge_relationship(&edge.source, &edge.target, &edge.predicate),
                &edge.source,
                "relationship",
            );
        }
        out
    }

    /// ``MERGE (n:`label` {id: '...'}) SET n += {...}``
    pub fn merge_node(
        &self,
        id: &str,
        class: &str,
        friendly_name: Option<&str>,
        attributes: &Attributes,
    ) -> RenderResult<String> {
        let label = clean_name(class).ok_or(RenderError::EmptyLabel)?;

        let mut props: Map<String, Value> = attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(name) = friendly_name {
            props.insert("friendlyName".to_string(), Value::String(name.to_string()));
        }

        let mut props_str = String::new();
        self.write_map(&mut props_str, &props, 0)?;

        Ok(format!(
            "MERGE (n:`{}` {{id: {}}}) SET n += {}",
            label,
            quote_string(id),
            props_str
        ))
    }

    /// ``MATCH (a {id: '...'}), (b {id: '...'}) MERGE (a)-[:`type`]->(b)``
    pub fn merge_relationship(&self, source: &str, target: &str, predicate: &str) -> RenderResult<String> {
        let rel = clean_name(predicate).ok_or(RenderError::EmptyType)?;
        Ok(format!(
            "MATCH (a {{id: {}}}), (b {{id: {}}}) MERGE (a)-[:`{}`]->(b)",
            quote_string(source),
            quote_string(target),
            rel
        ))
    }

    /// Render a JSON value as a Cypher literal.
    pub fn literal(&self, value: &Value) -> RenderResult<String> {
        let mut out = String::new();
        self.write_value(&mut out, value, 0)?;
        Ok(out)
    }

    fn write_value(&self, out: &mut String, value: &Value, depth: usize) -> RenderResult<()> {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::String(s) => out.push_str(&quote_string(s)),
            Value::Array(items) => {
                if depth >= self.max_depth {
                    return Err(RenderError::TooDeep(self.max_depth));
                }
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(out, item, depth + 1)?;
                }
                out.push(']');
            }
            Value::Object(map) => self.write_map(out, map, depth)?,
        }
        Ok(())
    }

    /// Keys are written in sorted order.
    fn write_map(&self, out: &mut String, map: &Map<String, Value>, depth: usize) -> RenderResult<()> {
        if depth >= self.max_depth {
            return Err(RenderError::TooDeep(self.max_depth));
        }
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        out.push('{');
        for (i, (key, value)) in entries.into_iter().enumerate() {
            if key.is_empty() {
                return Err(RenderError::EmptyKey);
            }
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&quote_key(key));
            out.push_str(": ");
            self.write_value(out, value, depth + 1)?;
        }
        out.push('}');
        Ok(())
    }
}

/// Label or relationship type: `:` becomes `_`, backticks are doubled.
fn clean_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    Some(name.replace(':', "_").replace('`', "``"))
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

/// Builder answering to `cypher` and `neo4j`.
#[derive(Debug, Clone, Default)]
pub struct CypherBuilder {
    compiler: QueryCompiler,
}

impl CypherBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Builder for CypherBuilder {
    fn name(&self) -> &'static str {
        "cypher"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["cypher", "neo4j"]
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        let compiled = self.compiler.compile(input);
        info!(
            "Compiled {} Cypher statements ({} skipped)",
            compiled.statements.len(),
            compiled.diagnostics.len()
        );
        Ok(Built::new(AssemblyOutput::Statements(compiled.statements))
            .with_diagnostics(compiled.diagnostics))
    }
}
