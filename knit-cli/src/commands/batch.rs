//! Batch command - assemble several inputs in parallel
//!
//! Each input is assembled independently on the rayon pool unless `--merge`
//! is given, in which case the union of all inputs is assembled once so that
//! links and import targets span files.

use crate::output::{truncate, JsonOutput, Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use knit_core::{Assembler, Assembly, Dataset};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{output_extension, read_dataset, write_output};

/// Options for `knit batch`.
#[derive(Debug, Clone)]
pub struct BatchOptions<'a> {
    pub strategy: &'a str,
    pub merge: bool,
    pub threads: Option<usize>,
    pub out_dir: Option<&'a Path>,
    pub compact: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Outcome for one input (or for the merged union).
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'static str>,
    pub items: usize,
    pub diagnostics: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    fn succeeded(input: &str, assembly: &Assembly, written_to: Option<String>) -> Self {
        Self {
            input: input.to_string(),
            builder: Some(assembly.builder.clone()),
            output: Some(assembly.output.kind()),
            items: assembly.output.item_count(),
            diagnostics: assembly.diagnostics.len(),
            written_to,
            error: None,
        }
    }

    fn failed(input: &str, error: &anyhow::Error) -> Self {
        Self {
            input: input.to_string(),
            builder: None,
            output: None,
            items: 0,
            diagnostics: 0,
            written_to: None,
            error: Some(format!("{:#}", error)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub strategy: String,
    pub merged: bool,
    pub runs: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|r| r.error.is_some()).count()
    }
}

impl TableDisplay for BatchReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = self
            .runs
            .iter()
            .map(|r| {
                let status = match (&r.error, &r.written_to) {
                    (Some(e), _) => {
                        let text = truncate(e, 60);
                        if config.no_color {
                            text
                        } else {
                            text.red().to_string()
                        }
                    }
                    (None, Some(path)) => path.clone(),
                    (None, None) => "ok".to_string(),
                };
                vec![
                    r.input.clone(),
                    r.builder.clone().unwrap_or_else(|| "-".to_string()),
                    r.output.unwrap_or("-").to_string(),
                    r.items.to_string(),
                    r.diagnostics.to_string(),
                    status,
                ]
            })
            .collect();

        let mut output = TableOutput::from_rows(
            &["Input", "Builder", "Output", "Items", "Diagnostics", "Status"],
            &rows,
            config,
        );

        let failures = self.failures();
        let footer = format!(
            "\n{} of {} runs succeeded",
            self.runs.len() - failures,
            self.runs.len()
        );
        if config.no_color || failures == 0 {
            output.push_str(&footer);
        } else {
            output.push_str(&footer.yellow().to_string());
        }
        output
    }
}

/// Run the batch command.
pub fn run(assembler: &Assembler, inputs: &[String], options: &BatchOptions<'_>) -> Result<()> {
    let report = if options.merge {
        run_merged(assembler, inputs, options)?
    } else {
        run_each(assembler, inputs, options)?
    };

    let failures = report.failures();
    let total = report.runs.len();
    if !options.quiet {
        Output::new(report, options.format)
            .compact(options.compact)
            .render_stderr()?;
    }

    if failures > 0 {
        bail!("{} of {} inputs failed", failures, total);
    }
    Ok(())
}

fn run_merged(assembler: &Assembler, inputs: &[String], options: &BatchOptions<'_>) -> Result<BatchReport> {
    let datasets = inputs
        .iter()
        .map(|input| read_dataset(input))
        .collect::<Result<Vec<_>>>()?;

    let assembly = assembler
        .run_merged(&datasets, options.strategy)
        .with_context(|| format!("Failed to assemble {} merged inputs", inputs.len()))?;

    let path = options
        .out_dir
        .map(|dir| dir.join(format!("merged.{}", output_extension(&assembly.output))));
    write_output(&assembly, path.as_deref(), options.compact)?;

    Ok(BatchReport {
        strategy: options.strategy.to_string(),
        merged: true,
        runs: vec![BatchEntry::succeeded(
            &inputs.join(" + "),
            &assembly,
            path.map(|p| p.display().to_string()),
        )],
    })
}

fn run_each(assembler: &Assembler, inputs: &[String], options: &BatchOptions<'_>) -> Result<BatchReport> {
    let mut entries: Vec<Option<BatchEntry>> = inputs.iter().map(|_| None).collect();
    let mut loaded: Vec<usize> = Vec::new();
    let mut datasets: Vec<Dataset> = Vec::new();

    for (idx, input) in inputs.iter().enumerate() {
        match read_dataset(input) {
            Ok(dataset) => {
                loaded.push(idx);
                datasets.push(dataset);
            }
            Err(e) => entries[idx] = Some(BatchEntry::failed(input, &e)),
        }
    }

    let results = assembler.run_batch(&datasets, options.strategy, options.threads);

    let mut documents = Map::new();
    let mut used_names = HashSet::new();
    for (idx, result) in loaded.into_iter().zip(results) {
        let input = &inputs[idx];
        let entry = match result {
            Ok(assembly) => match deliver(&assembly, input, options, &mut documents, &mut used_names) {
                Ok(written_to) => BatchEntry::succeeded(input, &assembly, written_to),
                Err(e) => BatchEntry::failed(input, &e),
            },
            Err(e) => {
                let e = anyhow::Error::new(e).context(format!("Failed to assemble {}", input));
                BatchEntry::failed(input, &e)
            }
        };
        entries[idx] = Some(entry);
    }

    if options.out_dir.is_none() {
        let text = JsonOutput::to_document(&Value::Object(documents), options.compact)
            .context("Failed to serialize batch results")?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", text).context("Failed to write results to stdout")?;
    }

    Ok(BatchReport {
        strategy: options.strategy.to_string(),
        merged: false,
        runs: entries.into_iter().flatten().collect(),
    })
}

/// Write one result into `out_dir`, or file it under its input path for the
/// combined stdout document. Returns the written path, if any.
fn deliver(
    assembly: &Assembly,
    input: &str,
    options: &BatchOptions<'_>,
    documents: &mut Map<String, Value>,
    used_names: &mut HashSet<String>,
) -> Result<Option<String>> {
    match options.out_dir {
        Some(dir) => {
            let path = unique_output_path(dir, input, output_extension(&assembly.output), used_names);
            write_output(assembly, Some(&path), options.compact)?;
            Ok(Some(path.display().to_string()))
        }
        None => {
            if documents.contains_key(input) {
                bail!("Duplicate input {}: its result is already in the output", input);
            }
            let value = serde_json::to_value(&assembly.output)
                .with_context(|| format!("Failed to serialize result for {}", input))?;
            documents.insert(input.to_string(), value);
            Ok(None)
        }
    }
}

/// `<dir>/<stem>.<ext>`, suffixed with a counter when two inputs share a stem.
fn unique_output_path(dir: &Path, input: &str, ext: &str, used: &mut HashSet<String>) -> PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let mut name = stem.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{}-{}", stem, n);
        n += 1;
    }
    dir.join(format!("{}.{}", name, ext))
}
