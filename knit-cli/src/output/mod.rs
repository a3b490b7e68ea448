//! Output formatting module for Knit CLI
//!
//! Command reports render either as human-readable tables or as JSON.
//! Colors are disabled automatically when the report stream is not a TTY.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::OnceLock;

mod json;
mod table;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;

/// Output format for CLI reports
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// Configuration for output rendering
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// The output format to use
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Compact mode (less whitespace)
    pub compact: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            compact: false,
        }
    }

    /// Create an OutputConfig with automatic TTY detection on `stream`.
    ///
    /// `color_override` of `Some(_)` forces colors on or off.
    pub fn auto_detect(format: OutputFormat, stream: Stream, color_override: Option<bool>) -> Self {
        let is_tty = match stream {
            Stream::Stdout => std::io::stdout().is_terminal(),
            Stream::Stderr => std::io::stderr().is_terminal(),
        };
        Self {
            no_color: !color_override.unwrap_or(is_tty),
            ..Self::new(format)
        }
    }

    /// Builder: enable compact mode
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

static COLOR_OVERRIDE: OnceLock<Option<bool>> = OnceLock::new();

/// Force colors on or off for every report; `None` keeps TTY detection.
///
/// Only the first call takes effect.
pub fn set_color_override(color: Option<bool>) {
    let _ = COLOR_OVERRIDE.set(color);
    if let Some(color) = color {
        colored::control::set_override(color);
    }
}

/// Where a report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Types that can be displayed as a table
pub trait TableDisplay: Serialize {
    /// Convert to table format string
    fn to_table(&self, config: &OutputConfig) -> String;
}

/// Render `data` in the configured format.
pub fn render<T: TableDisplay>(data: &T, config: &OutputConfig) -> String {
    match config.format {
        OutputFormat::Table => data.to_table(config),
        OutputFormat::Json => JsonOutput::format(data, config),
    }
}

/// Result wrapper for formatted output
pub struct Output<T> {
    data: T,
    format: OutputFormat,
    compact: bool,
}

impl<T: TableDisplay> Output<T> {
    /// Create a new output wrapper with specified format
    pub fn new(data: T, format: OutputFormat) -> Self {
        Self {
            data,
            format,
            compact: false,
        }
    }

    /// Builder: set compact mode
    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    fn config(&self, stream: Stream) -> OutputConfig {
        let color = COLOR_OVERRIDE.get().copied().flatten();
        let config = OutputConfig::auto_detect(self.format, stream, color);
        if self.compact {
            config.compact()
        } else {
            config
        }
    }

    /// Render the output to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        println!("{}", render(&self.data, &self.config(Stream::Stdout)));
        Ok(())
    }

    /// Render the output to stderr, leaving stdout for results
    pub fn render_stderr(&self) -> anyhow::Result<()> {
        eprintln!("{}", render(&self.data, &self.config(Stream::Stderr)));
        Ok(())
    }
}

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}
