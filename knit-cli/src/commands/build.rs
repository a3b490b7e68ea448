//! Build command - assemble one dataset
//!
//! Reads a node payload, runs the selected builder and writes the result.
//! The report (builder, counts, diagnostics) goes to stderr.

use crate::output::{truncate, Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::{Context, Result};
use colored::Colorize;
use knit_core::{Assembler, AssemblySummary, Diagnostic};
use serde::Serialize;
use std::path::Path;

use super::{display_name, read_payload, write_output};

/// Diagnostics listed individually in table output.
const MAX_LISTED_DIAGNOSTICS: usize = 20;

/// Report for a single assembly run.
#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub summary: AssemblySummary,
    pub diagnostics: Vec<Diagnostic>,
}

impl TableDisplay for BuildReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let s = &self.summary;
        let mut pairs = vec![
            ("Input", self.input.clone()),
            ("Builder", s.builder.clone()),
            ("Output", format!("{} ({} items)", s.output, s.items)),
        ];
        if s.output == "graph" {
            pairs.push(("Nodes", s.nodes.to_string()));
            pairs.push((
                "Edges",
                format!("{} ({} reverse)", s.edges, s.reverse_edges),
            ));
        }
        pairs.push(("Elapsed", format!("{:.2}ms", s.elapsed_ms)));
        if let Some(ref path) = self.output_path {
            pairs.push(("Written to", path.clone()));
        }

        let mut output = TableOutput::format_key_value(&pairs, config);
        output.push('\n');

        if self.diagnostics.is_empty() {
            if config.no_color {
                output.push_str("No diagnostics\n");
            } else {
                output.push_str(&format!("{}\n", "No diagnostics".green()));
            }
            return output;
        }

        let counts: Vec<String> = s
            .diagnostics
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect();
        let header = format!("{} diagnostics: {}", self.diagnostics.len(), counts.join(", "));
        if config.no_color {
            output.push_str(&header);
        } else {
            output.push_str(&header.yellow().to_string());
        }
        output.push('\n');

        for d in self.diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
            output.push_str(&format!("  {}\n", truncate(&d.to_string(), 120)));
        }
        if self.diagnostics.len() > MAX_LISTED_DIAGNOSTICS {
            output.push_str(&format!(
                "  ... and {} more\n",
                self.diagnostics.len() - MAX_LISTED_DIAGNOSTICS
            ));
        }

        output
    }
}

/// Run the build command.
pub fn run(
    assembler: &Assembler,
    input: &str,
    strategy: &str,
    output: Option<&Path>,
    compact: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let payload = read_payload(input)?;
    let assembly = assembler
        .run(&payload, strategy)
        .with_context(|| format!("Failed to assemble {}", display_name(input)))?;

    write_output(&assembly, output, compact)?;

    if quiet {
        return Ok(());
    }

    let report = BuildReport {
        input: display_name(input).to_string(),
        output_path: output.map(|p| p.display().to_string()),
        summary: assembly.summary(),
        diagnostics: assembly.diagnostics,
    };
    Output::new(report, format).compact(compact).render_stderr()
}
