//! Command implementations for Knit CLI
//!
//! Each command module provides a `run` function that executes the command logic.
//! Assembly results go to stdout or a file; reports go to stderr so results
//! can be piped.

pub mod batch;
pub mod build;
pub mod score;
pub mod strategies;

use crate::output::JsonOutput;
use anyhow::{Context, Result};
use knit_core::{Assembly, AssemblyOutput, Dataset};
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Input argument meaning "read from stdin".
pub const STDIN: &str = "-";

/// Read a JSON payload from a file path or stdin.
pub fn read_payload(input: &str) -> Result<Value> {
    let content = if input == STDIN {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };

    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", display_name(input)))
}

/// Read and interpret a payload as a dataset.
pub fn read_dataset(input: &str) -> Result<Dataset> {
    let payload = read_payload(input)?;
    Dataset::from_value(&payload).with_context(|| format!("Invalid dataset in {}", display_name(input)))
}

pub fn display_name(input: &str) -> &str {
    if input == STDIN {
        "<stdin>"
    } else {
        input
    }
}

/// Render an assembly result as text.
///
/// Graph exports and vector payloads are JSON documents; Cypher statements
/// are written one per line.
pub fn render_output(output: &AssemblyOutput, compact: bool) -> Result<String> {
    match output {
        AssemblyOutput::Statements(statements) => {
            let mut text = statements.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            Ok(text)
        }
        other => {
            let mut text = JsonOutput::to_document(other, compact).context("Failed to serialize result")?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// File extension matching [`render_output`].
pub fn output_extension(output: &AssemblyOutput) -> &'static str {
    match output {
        AssemblyOutput::Statements(_) => "cypher",
        _ => "json",
    }
}

/// Write an assembly result to `path`, or stdout when `path` is `None`.
pub fn write_output(assembly: &Assembly, path: Option<&Path>, compact: bool) -> Result<()> {
    let text = render_output(&assembly.output, compact)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("Failed to write result to stdout")?;
            stdout.flush().context("Failed to flush stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_core::{Edge, Graph};

    #[test]
    fn test_statements_one_per_line() {
        let output = AssemblyOutput::Statements(vec!["MERGE (a)".to_string(), "MERGE (b)".to_string()]);
        assert_eq!(render_output(&output, false).unwrap(), "MERGE (a)\nMERGE (b)\n");
        assert_eq!(output_extension(&output), "cypher");
    }

    #[test]
    fn test_empty_statements() {
        let output = AssemblyOutput::Statements(Vec::new());
        assert_eq!(render_output(&output, false).unwrap(), "");
    }

    #[test]
    fn test_graph_as_json() {
        let mut graph = Graph::new();
        graph.add_edge(Edge::forward("a", "b", "knit:next"));
        let output = AssemblyOutput::Graph(graph.into_export(Default::default()));

        let text = render_output(&output, true).unwrap();
        assert_eq!(text.lines().count(), 1);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["edges"][0]["type"], "knit:next");
        assert_eq!(output_extension(&output), "json");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("-"), "<stdin>");
        assert_eq!(display_name("nodes.json"), "nodes.json");
    }
}
