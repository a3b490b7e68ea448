//! Pluggable graph builders.
//!
//! Each builder turns a [`Dataset`] into one output form and declares the
//! strategy names it answers to. The [`registry`](crate::registry) chooses
//! among them.

pub mod code;
pub mod cypher;
pub mod linker;
pub mod timeline;
pub mod vector;

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{Dataset, GraphExport};

pub use code::{CodeGraphBuilder, CodeStructureBuilder};
pub use cypher::{CypherBuilder, QueryCompiler};
pub use linker::{reverse_predicate, GraphBuilder, HierarchyBuilder, LinkerOptions};
pub use timeline::TimelineBuilder;
pub use vector::{VectorBuilder, VectorPayload};

/// A strategy for turning a dataset into an output form.
pub trait Builder: Send + Sync {
    /// Declared name, reported in results and logs.
    fn name(&self) -> &'static str;

    /// Every strategy name this builder answers to, including [`name`](Self::name).
    fn strategies(&self) -> &'static [&'static str];

    /// Self-assessed confidence in `[0, 1]` that this builder suits `input`.
    ///
    /// Only consulted when the strategy hint names no builder.
    fn can_handle(&self, _input: &Dataset, _strategy: &str) -> Result<f64> {
        Ok(0.0)
    }

    /// Produce the output for `input`.
    fn build(&self, input: &Dataset) -> Result<Built>;
}

/// What a builder returns.
#[derive(Debug, Clone)]
pub struct Built {
    pub output: AssemblyOutput,
    pub diagnostics: Vec<Diagnostic>,
}

impl Built {
    pub fn new(output: AssemblyOutput) -> Self {
        Self {
            output,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Output of one assembly run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssemblyOutput {
    Graph(GraphExport),
    Statements(Vec<String>),
    Vectors(Vec<VectorPayload>),
}

impl AssemblyOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            AssemblyOutput::Graph(_) => "graph",
            AssemblyOutput::Statements(_) => "statements",
            AssemblyOutput::Vectors(_) => "vectors",
        }
    }

    pub fn as_graph(&self) -> Option<&GraphExport> {
        match self {
            AssemblyOutput::Graph(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_statements(&self) -> Option<&[String]> {
        match self {
            AssemblyOutput::Statements(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vectors(&self) -> Option<&[VectorPayload]> {
        match self {
            AssemblyOutput::Vectors(v) => Some(v),
            _ => None,
        }
    }

    /// Number of top-level items: nodes, statements, or payloads.
    pub fn item_count(&self) -> usize {
        match self {
            AssemblyOutput::Graph(g) => g.nodes.len(),
            AssemblyOutput::Statements(s) => s.len(),
            AssemblyOutput::Vectors(v) => v.len(),
        }
    }
}
