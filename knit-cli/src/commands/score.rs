//! Score command - show how the resolver sees an input

use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::Result;
use colored::Colorize;
use knit_core::{Assembler, AssemblyError, Candidate};
use serde::Serialize;

use super::{display_name, read_dataset};

#[derive(Debug, Serialize)]
pub struct ScoreReport {
    pub input: String,
    pub strategy: String,
    /// True when the strategy named a builder directly and scoring was skipped.
    pub explicit: bool,
    pub candidates: Vec<Candidate>,
    /// Builder the resolver picks, if any.
    pub selected: Option<String>,
}

impl TableDisplay for ScoreReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = self
            .candidates
            .iter()
            .map(|c| {
                let marker = if self.selected.as_deref() == Some(c.builder) {
                    "*"
                } else {
                    ""
                };
                vec![
                    marker.to_string(),
                    c.builder.to_string(),
                    format!("{:.2}", c.score),
                    c.error.clone().unwrap_or_default(),
                ]
            })
            .collect();

        let mut output = TableOutput::from_rows(&["", "Builder", "Score", "Error"], &rows, config);
        output.push('\n');

        let verdict = match (&self.selected, self.explicit) {
            (Some(name), true) => format!("Strategy '{}' names {} directly", self.strategy, name),
            (Some(name), false) => format!("Strategy '{}' selects {}", self.strategy, name),
            (None, _) => format!("Strategy '{}' matches no builder", self.strategy),
        };
        if config.no_color {
            output.push_str(&verdict);
        } else if self.selected.is_some() {
            output.push_str(&verdict.green().to_string());
        } else {
            output.push_str(&verdict.red().to_string());
        }
        output
    }
}

/// Run the score command.
pub fn run(assembler: &Assembler, input: &str, strategy: &str, format: OutputFormat) -> Result<()> {
    let dataset = read_dataset(input)?;
    let report = score(assembler, &dataset, strategy, display_name(input))?;
    Output::new(report, format).render()
}

fn score(
    assembler: &Assembler,
    dataset: &knit_core::Dataset,
    strategy: &str,
    input: &str,
) -> Result<ScoreReport> {
    let candidates = assembler.score_table(dataset, strategy);
    let explicit = assembler.builder(strategy).is_some();
    let selected = match assembler.resolve(dataset, strategy) {
        Ok(builder) => Some(builder.name().to_string()),
        Err(AssemblyError::NoBuilder { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(ScoreReport {
        input: input.to_string(),
        strategy: strategy.to_string(),
        explicit,
        candidates,
        selected,
    })
}
