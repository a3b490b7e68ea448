//! Assembly pipeline: payload -> dataset -> builder -> output.

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::builders::{AssemblyOutput, Builder};
use crate::diagnostics::{self, Diagnostic, DiagnosticKind};
use crate::error::{AssemblyError, Result};
use crate::model::Dataset;
use crate::registry::{self, BuilderRegistry};

/// Result of one assembly run.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Declared name of the builder that ran.
    pub builder: String,
    pub output: AssemblyOutput,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed: Duration,
}

impl Assembly {
    pub fn summary(&self) -> AssemblySummary {
        let (nodes, edges, reverse_edges) = match &self.output {
            AssemblyOutput::Graph(g) => (
                g.stats.node_count,
                g.stats.edge_count,
                g.stats.reverse_edge_count,
            ),
            _ => (0, 0, 0),
        };
        AssemblySummary {
            builder: self.builder.clone(),
            output: self.output.kind(),
            items: self.output.item_count(),
            nodes,
            edges,
            reverse_edges,
            diagnostics: diagnostics::summarize(&self.diagnostics),
            elapsed_ms: self.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Counts describing an [`Assembly`], for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblySummary {
    pub builder: String,
    pub output: &'static str,
    pub items: usize,
    pub nodes: usize,
    pub edges: usize,
    pub reverse_edges: usize,
    pub diagnostics: BTreeMap<DiagnosticKind, usize>,
    pub elapsed_ms: f64,
}

#[derive(Clone)]
enum RegistrySource {
    Global,
    Owned(Arc<BuilderRegistry>),
}

/// Facade over the registry: resolves a builder per run and times it.
#[derive(Clone)]
pub struct Assembler {
    registry: RegistrySource,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Assembler backed by the process-wide registry.
    pub fn new() -> Self {
        Self {
            registry: RegistrySource::Global,
        }
    }

    /// Assembler backed by a private registry.
    pub fn with_registry(registry: BuilderRegistry) -> Self {
        Self {
            registry: RegistrySource::Owned(Arc::new(registry)),
        }
    }

    /// Pick the builder for `input`; the registry lock is held only while
    /// resolving.
    pub fn resolve(&self, input: &Dataset, strategy: &str) -> Result<Arc<dyn Builder>> {
        match &self.registry {
            RegistrySource::Global => registry::read_global().resolve(input, strategy),
            RegistrySource::Owned(registry) => registry.resolve(input, strategy),
        }
    }

    /// Builder registered under `strategy`, without scoring.
    pub fn builder(&self, strategy: &str) -> Option<Arc<dyn Builder>> {
        match &self.registry {
            RegistrySource::Global => registry::read_global().get(strategy),
            RegistrySource::Owned(registry) => registry.get(strategy),
        }
    }

    /// Registered builders in registration order.
    pub fn builders(&self) -> Vec<Arc<dyn Builder>> {
        match &self.registry {
            RegistrySource::Global => registry::read_global().builders().cloned().collect(),
            RegistrySource::Owned(registry) => registry.builders().cloned().collect(),
        }
    }

    /// Score table for `input`, as the resolver sees it.
    pub fn score_table(&self, input: &Dataset, strategy: &str) -> Vec<registry::Candidate> {
        match &self.registry {
            RegistrySource::Global => registry::read_global().score_table(input, strategy),
            RegistrySource::Owned(registry) => registry.score_table(input, strategy),
        }
    }

    /// Assemble a raw JSON payload.
    pub fn run(&self, payload: &Value, strategy: &str) -> Result<Assembly> {
        let dataset = Dataset::from_value(payload)?;
        self.run_dataset(&dataset, strategy)
    }

    /// Assemble a parsed dataset.
    pub fn run_dataset(&self, input: &Dataset, strategy: &str) -> Result<Assembly> {
        let start = Instant::now();
        let builder = self.resolve(input, strategy)?;

        debug!("Building {} nodes with {}", input.len(), builder.name());
        // A builder panic becomes a Build error for this run.
        let built = panic::catch_unwind(AssertUnwindSafe(|| builder.build(input))).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!("Builder {} panicked: {}", builder.name(), message);
            AssemblyError::Build {
                builder: builder.name().to_string(),
                message,
            }
        })??;
        let elapsed = start.elapsed();

        match &built.output {
            AssemblyOutput::Graph(g) => info!(
                "Assembled with {}: {} nodes, {} edges ({} reverse) in {:?}",
                builder.name(),
                g.stats.node_count,
                g.stats.edge_count,
                g.stats.reverse_edge_count,
                elapsed
            ),
            other => info!(
                "Assembled with {}: {} {} in {:?}",
                builder.name(),
                other.item_count(),
                other.kind(),
                elapsed
            ),
        }
        if !built.diagnostics.is_empty() {
            info!("{} diagnostics recorded", built.diagnostics.len());
        }

        Ok(Assembly {
            builder: builder.name().to_string(),
            output: built.output,
            diagnostics: built.diagnostics,
            elapsed,
        })
    }

    /// Assemble several datasets independently and in parallel.
    ///
    /// Results come back in input order. `threads` of `None` or `Some(0)`
    /// uses rayon's global pool.
    pub fn run_batch(
        &self,
        inputs: &[Dataset],
        strategy: &str,
        threads: Option<usize>,
    ) -> Vec<Result<Assembly>> {
        let pool = match threads {
            Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
            _ => None,
        };

        let run_fn = |input: &Dataset| self.run_dataset(input, strategy);

        info!("Assembling {} datasets in parallel", inputs.len());
        match pool {
            Some(pool) => pool.install(|| inputs.par_iter().map(run_fn).collect()),
            None => inputs.par_iter().map(run_fn).collect(),
        }
    }

    /// Assemble the union of several datasets in one run, so indexes and
    /// link targets span every input.
    pub fn run_merged(&self, inputs: &[Dataset], strategy: &str) -> Result<Assembly> {
        let merged = Dataset::merge(inputs);
        info!(
            "Merged {} datasets into {} nodes",
            inputs.len(),
            merged.len()
        );
        self.run_dataset(&merged, strategy)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::Built;
    use crate::registry::AUTO;
    use serde_json::json;

    struct Exploding;

    impl Builder for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn strategies(&self) -> &'static [&'static str] {
            &["exploding"]
        }

        fn build(&self, _input: &Dataset) -> Result<Built> {
            panic!("index out of range");
        }
    }

    #[test]
    fn test_run_payload() {
        let assembler = Assembler::with_registry(BuilderRegistry::with_defaults());
        let payload = json!({
            "nodes": [
                {"id": "A", "class": "knit:Chunk", "relationships": {"hasParent": ["B"]}},
                {"id": "B", "class": "knit:Topic"}
            ],
            "metadata": {"doc": "d1"}
        });
        let assembly = assembler.run(&payload, "graph").unwrap();
        assert_eq!(assembly.builder, "graph");

        let graph = assembly.output.as_graph().unwrap();
        assert_eq!(graph.metadata["doc"], json!("d1"));

        let summary = assembly.summary();
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.reverse_edges, 1);
        assert_eq!(summary.output, "graph");
    }

    #[test]
    fn test_shape_error() {
        let assembler = Assembler::with_registry(BuilderRegistry::with_defaults());
        let err = assembler.run(&json!(42), AUTO).unwrap_err();
        assert!(matches!(err, AssemblyError::Shape(_)));
    }

    #[test]
    fn test_empty_registry_is_routing_error() {
        let assembler = Assembler::with_registry(BuilderRegistry::new());
        let err = assembler.run_dataset(&Dataset::default(), AUTO).unwrap_err();
        assert!(err.is_routing());
    }

    #[test]
    fn test_merged_sees_cross_document_targets() {
        let a = Dataset::from_value(&json!([
            {"id": "child", "class": "knit:Chunk", "relationships": {"knit:hasParent": "parent"}}
        ]))
        .unwrap();
        let b = Dataset::from_value(&json!([{"id": "parent", "class": "knit:Topic"}])).unwrap();

        let assembler = Assembler::with_registry(BuilderRegistry::with_defaults());
        let separate = assembler.run_batch(&[a.clone(), b.clone()], "hierarchy", Some(2));
        assert_eq!(separate.len(), 2);
        let first = separate[0].as_ref().unwrap();
        assert_eq!(first.output.as_graph().unwrap().edges.len(), 0);
        assert_eq!(first.diagnostics.len(), 1);

        let merged = assembler.run_merged(&[a, b], "hierarchy").unwrap();
        assert_eq!(merged.output.as_graph().unwrap().edges.len(), 2);
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_builder_panic_is_build_error() {
        let mut registry = BuilderRegistry::with_defaults();
        registry.register(Arc::new(Exploding));
        let assembler = Assembler::with_registry(registry);
        let inputs = vec![Dataset::default(), Dataset::default()];

        let results = assembler.run_batch(&inputs, "exploding", Some(2));
        assert_eq!(results.len(), 2);
        for result in results {
            match result {
                Err(AssemblyError::Build { builder, message }) => {
                    assert_eq!(builder, "exploding");
                    assert_eq!(message, "index out of range");
                }
                other => panic!("expected a build error, got {:?}", other.map(|a| a.builder)),
            }
        }

        // other strategies are unaffected
        assert!(assembler.run_dataset(&Dataset::default(), "graph").is_ok());
    }
}
