//! Strategies command - list registered builders

use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};
use anyhow::Result;
use knit_core::{Assembler, AUTO};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StrategyEntry {
    pub builder: &'static str,
    pub strategies: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StrategyList {
    pub builders: Vec<StrategyEntry>,
}

impl TableDisplay for StrategyList {
    fn to_table(&self, config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = self
            .builders
            .iter()
            .map(|b| vec![b.builder.to_string(), b.strategies.join(", ")])
            .collect();
        let mut output = TableOutput::from_rows(&["Builder", "Strategies"], &rows, config);
        output.push_str(&format!(
            "\nUse '{}' to let builders score the input.",
            AUTO
        ));
        output
    }
}

pub fn list(assembler: &Assembler) -> StrategyList {
    StrategyList {
        builders: assembler
            .builders()
            .iter()
            .map(|b| StrategyEntry {
                builder: b.name(),
                strategies: b.strategies().to_vec(),
            })
            .collect(),
    }
}

/// Run the strategies command.
pub fn run(assembler: &Assembler, format: OutputFormat) -> Result<()> {
    Output::new(list(assembler), format).render()
}
