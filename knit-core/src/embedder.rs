//! Embedding boundary for the vector payload builder.
//!
//! The engine never generates embeddings itself; callers inject an
//! implementation of [`Embedder`].

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Failed to generate embedding
    #[error("embedding failed: {0}")]
    Failed(String),

    /// Vector length differs from the model's declared dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for embedding operations.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Converts text to a dense vector.
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;

    /// Length of every vector [`embed`](Self::embed) returns.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}
