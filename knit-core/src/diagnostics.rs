//! Non-fatal records of items a builder skipped or could not resolve.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A relationship points at an id that is not in the input.
    DanglingTarget,
    /// An import could not be matched to any indexed file.
    UnresolvedImport,
    /// An import named a symbol the resolved file does not define.
    MissingSymbol,
    /// A Cypher statement could not be rendered.
    SkippedStatement,
    /// The embedder failed for a node.
    EmbeddingFailed,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DanglingTarget => "dangling_target",
            DiagnosticKind::UnresolvedImport => "unresolved_import",
            DiagnosticKind::MissingSymbol => "missing_symbol",
            DiagnosticKind::SkippedStatement => "skipped_statement",
            DiagnosticKind::EmbeddingFailed => "embedding_failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Node the diagnostic is about, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            node_id: Some(node_id.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_id {
            Some(id) => write!(f, "[{}] {}: {}", self.kind, id, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Count diagnostics per kind.
pub fn summarize(diagnostics: &[Diagnostic]) -> BTreeMap<DiagnosticKind, usize> {
    let mut counts = BTreeMap::new();
    for d in diagnostics {
        *counts.entry(d.kind).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(DiagnosticKind::UnresolvedImport, "f1", "module 'os' not found");
        assert_eq!(d.to_string(), "[unresolved_import] f1: module 'os' not found");

        let d = Diagnostic {
            node_id: None,
            ..Diagnostic::new(DiagnosticKind::SkippedStatement, "", "empty label")
        };
        assert_eq!(d.to_string(), "[skipped_statement] empty label");
    }

    #[test]
    fn test_summarize() {
        let diags = vec![
            Diagnostic::new(DiagnosticKind::DanglingTarget, "a", "x"),
            Diagnostic::new(DiagnosticKind::DanglingTarget, "b", "y"),
            Diagnostic::new(DiagnosticKind::MissingSymbol, "c", "z"),
        ];
        let counts = summarize(&diags);
        assert_eq!(counts[&DiagnosticKind::DanglingTarget], 2);
        assert_eq!(counts[&DiagnosticKind::MissingSymbol], 1);
        assert!(!counts.contains_key(&DiagnosticKind::EmbeddingFailed));
    }

    #[test]
    fn test_serialization() {
        let d = Diagnostic::new(DiagnosticKind::EmbeddingFailed, "n", "timeout");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "embedding_failed");
        assert_eq!(json["nodeId"], "n");
    }
}
