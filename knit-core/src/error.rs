//! Error types for knit-core.

use thiserror::Error;

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Structural failures that abort an assembly run.
///
/// Per-item misses (an unresolved import, a dangling relationship target, a
/// statement that cannot be rendered) are not errors; they are reported as
/// [`Diagnostic`](crate::diagnostics::Diagnostic) records next to the output.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// No registered builder accepted the input.
    #[error("no builder found for strategy '{strategy}' (available: {})", available.join(", "))]
    NoBuilder {
        /// Strategy hint that was requested.
        strategy: String,
        /// Strategy names known to the registry.
        available: Vec<String>,
    },

    /// Input cannot be interpreted as a node list.
    #[error("invalid input shape: {0}")]
    Shape(String),

    /// A builder could not score the input.
    #[error("[{builder}] scoring failed: {message}")]
    Scoring {
        /// Declared name of the builder.
        builder: String,
        /// Description of the failure.
        message: String,
    },

    /// A builder failed while assembling.
    #[error("[{builder}] build failed: {message}")]
    Build {
        /// Declared name of the builder.
        builder: String,
        /// Description of the failure.
        message: String,
    },

    /// JSON decoding error for raw payloads.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssemblyError {
    /// Shorthand for a shape error.
    pub fn shape(message: impl Into<String>) -> Self {
        AssemblyError::Shape(message.into())
    }

    /// Whether this error came from builder selection.
    pub fn is_routing(&self) -> bool {
        matches!(self, AssemblyError::NoBuilder { .. })
    }
}
