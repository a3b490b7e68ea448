//! Builder registry and strategy resolution.
//!
//! An explicit strategy name selects its builder directly. Anything else
//! (typically `auto`) lets every builder score the input; the first builder
//! with the highest positive score wins.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::builders::{
    Builder, CodeGraphBuilder, CodeStructureBuilder, CypherBuilder, GraphBuilder, HierarchyBuilder,
    LinkerOptions, TimelineBuilder, VectorBuilder,
};
use crate::error::{AssemblyError, Result};
use crate::model::Dataset;

/// Strategy hint that asks the registry to choose.
pub const AUTO: &str = "auto";

/// One row of the resolution score table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub builder: &'static str,
    pub score: f64,
    /// Set when `can_handle` failed; the score is then 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ordered collection of builders plus a strategy-name index.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: Vec<Arc<dyn Builder>>,
    by_strategy: HashMap<&'static str, usize>,
}

impl BuilderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in builder.
    pub fn with_defaults() -> Self {
        Self::with_linker_options(LinkerOptions::default())
    }

    /// Built-in builders, with the linkers configured by `options`.
    pub fn with_linker_options(options: LinkerOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GraphBuilder::with_options(options.clone())));
        registry.register(Arc::new(HierarchyBuilder::with_options(options)));
        registry.register(Arc::new(CodeGraphBuilder::new()));
        registry.register(Arc::new(CodeStructureBuilder::new()));
        registry.register(Arc::new(CypherBuilder::new()));
        registry.register(Arc::new(TimelineBuilder::new()));
        registry.register(Arc::new(VectorBuilder::new()));
        registry
    }

    /// Add a builder. A builder with the same declared name is replaced in
    /// place; its strategy names then point at the newcomer.
    pub fn register(&mut self, builder: Arc<dyn Builder>) {
        let slot = match self.builders.iter().position(|b| b.name() == builder.name()) {
            Some(pos) => {
                self.builders[pos] = builder;
                pos
            }
            None => {
                self.builders.push(builder);
                self.builders.len() - 1
            }
        };

        self.by_strategy.retain(|_, idx| *idx != slot);
        let builder = &self.builders[slot];
        self.by_strategy.insert(builder.name(), slot);
        for strategy in builder.strategies() {
            self.by_strategy.insert(*strategy, slot);
        }
        debug!("Registered builder '{}' for {:?}", builder.name(), builder.strategies());
    }

    /// Builder answering to `strategy`, if any.
    pub fn get(&self, strategy: &str) -> Option<Arc<dyn Builder>> {
        self.by_strategy
            .get(strategy)
            .map(|&idx| Arc::clone(&self.builders[idx]))
    }

    /// Every registered strategy name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_strategy.keys().map(|s| s.to_string()).collect();
        names.sort();
        names
    }

    /// Registered builders in registration order.
    pub fn builders(&self) -> impl Iterator<Item = &Arc<dyn Builder>> {
        self.builders.iter()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Ask every builder to score `input`, in registration order.
    ///
    /// Errors and non-finite or negative scores are recorded as 0.
    pub fn score_table(&self, input: &Dataset, strategy: &str) -> Vec<Candidate> {
        self.builders
            .iter()
            .map(|builder| {
                let (score, error) = match builder.can_handle(input, strategy) {
                    Ok(score) if score.is_finite() && score > 0.0 => (score, None),
                    Ok(_) => (0.0, None),
                    Err(e) => (0.0, Some(e.to_string())),
                };
                match &error {
                    Some(e) => debug!("  {:<16} score=0.00 (error: {})", builder.name(), e),
                    None => debug!("  {:<16} score={:.2}", builder.name(), score),
                }
                Candidate {
                    builder: builder.name(),
                    score,
                    error,
                }
            })
            .collect()
    }

    /// Choose the builder for `input`.
    pub fn resolve(&self, input: &Dataset, strategy: &str) -> Result<Arc<dyn Builder>> {
        let table = self.score_table(input, strategy);
        let summary = table
            .iter()
            .map(|c| format!("{}={:.2}", c.builder, c.score))
            .collect::<Vec<_>>()
            .join(", ");

        if let Some(builder) = self.get(strategy) {
            info!(
                "Strategy '{}' -> {} (explicit; candidates: {})",
                strategy,
                builder.name(),
                summary
            );
            return Ok(builder);
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in table.iter().enumerate() {
            if candidate.score > best.map_or(0.0, |(_, s)| s) {
                best = Some((idx, candidate.score));
            }
        }

        match best {
            Some((idx, score)) => {
                let builder = Arc::clone(&self.builders[idx]);
                info!(
                    "Strategy '{}' -> {} (score {:.2}; candidates: {})",
                    strategy,
                    builder.name(),
                    score,
                    summary
                );
                Ok(builder)
            }
            None => {
                info!("Strategy '{}' matched no builder (candidates: {})", strategy, summary);
                Err(AssemblyError::NoBuilder {
                    strategy: strategy.to_string(),
                    available: self.names(),
                })
            }
        }
    }
}

static GLOBAL: Lazy<RwLock<BuilderRegistry>> =
    Lazy::new(|| RwLock::new(BuilderRegistry::with_defaults()));

/// Process-wide registry, initialised with the built-in builders on first use.
pub fn global() -> &'static RwLock<BuilderRegistry> {
    &GLOBAL
}

/// Read access to the process-wide registry.
pub fn read_global() -> RwLockReadGuard<'static, BuilderRegistry> {
    GLOBAL.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Register a builder in the process-wide registry.
pub fn register_global(builder: Arc<dyn Builder>) {
    GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .register(builder);
}
