//! Vector payload builder: one `{id, vector, text, metadata}` record per
//! text-bearing node, ready for a vector store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::{AssemblyOutput, Builder, Built};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::embedder::{EmbedError, EmbedResult, Embedder};
use crate::error::Result;
use crate::model::{Attributes, Dataset};
use crate::ontology::attr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    /// `nodeClass`, `friendlyName` and every node attribute
    pub metadata: Attributes,
}

#[derive(Clone, Default)]
pub struct VectorBuilder {
    embedder: Option<Arc<dyn Embedder>>,
}

impl fmt::Debug for VectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorBuilder")
            .field("embedder", &self.embedder.as_ref().map(|e| e.model_name().to_string()))
            .finish()
    }
}

impl VectorBuilder {
    /// Builder without an embedder; payload vectors stay empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }
}

/// Embed `text`, rejecting vectors that do not match the declared dimension.
fn embed_checked(embedder: &dyn Embedder, text: &str) -> EmbedResult<Vec<f32>> {
    let vector = embedder.embed(text)?;
    let expected = embedder.dimension();
    if vector.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}

impl Builder for VectorBuilder {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn strategies(&self) -> &'static [&'static str] {
        &["vector"]
    }

    fn can_handle(&self, input: &Dataset, _strategy: &str) -> Result<f64> {
        let embedded = input.nodes.first().is_some_and(|n| {
            n.attributes.contains_key(attr::VECTOR) || n.attributes.contains_key(attr::EMBEDDING)
        });
        Ok(if embedded { 0.95 } else { 0.0 })
    }

    fn build(&self, input: &Dataset) -> Result<Built> {
        let mut payloads = Vec::new();
        let mut diagnostics = Vec::new();

        for node in &input.nodes {
            let Some(text) = node.attr_str(attr::TEXT).filter(|t| !t.is_empty()) else {
                continue;
            };

            let vector = match &self.embedder {
                Some(embedder) => embed_checked(embedder.as_ref(), text).unwrap_or_else(|e| {
                    warn!("Embedding failed for '{}': {}", node.id, e);
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::EmbeddingFailed,
                        node.id.clone(),
                        e.to_string(),
                    ));
                    Vec::new()
                }),
                None => Vec::new(),
            };

            let mut metadata = Attributes::new();
            metadata.insert("nodeClass".to_string(), Value::String(node.class.clone()));
            if let Some(name) = &node.friendly_name {
                metadata.insert("friendlyName".to_string(), Value::String(name.clone()));
            }
            metadata.extend(node.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

            payloads.push(VectorPayload {
                id: node.id.clone(),
                vector,
                text: text.to_string(),
                metadata,
            });
        }

        info!(
            "Built {} vector payloads ({})",
            payloads.len(),
            self.embedder
                .as_ref()
                .map_or("no embedder", |e| e.model_name())
        );

        Ok(Built::new(AssemblyOutput::Vectors(payloads)).with_diagnostics(diagnostics))
    }
}
