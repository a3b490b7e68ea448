//! Knit configuration loading from `.knitrc.toml`.
//!
//! Configuration is optional; every section falls back to defaults when the
//! file or the section is missing.
//!
//! # Example Configuration
//!
//! ```toml
//! [assembler]
//! strategy = "auto"
//! threads = 4
//!
//! [linker]
//! reverse_suffix = "_REV"
//!
//! [output]
//! format = "table"
//! color = true
//! compact = false
//! ```

use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".knitrc.toml";

/// Root configuration structure loaded from `.knitrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct KnitConfig {
    /// Builder selection and batch execution.
    #[serde(default)]
    pub assembler: AssemblerSettings,

    /// Default linker behavior.
    #[serde(default)]
    pub linker: LinkerSettings,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct AssemblerSettings {
    /// Default strategy hint when `--strategy` and `KNIT_STRATEGY` are unset.
    #[serde(default)]
    pub strategy: Option<String>,

    /// Worker threads for `knit batch`; unset uses one per CPU.
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LinkerSettings {
    /// Suffix appended to predicates without a reverse rewrite rule.
    #[serde(default)]
    pub reverse_suffix: Option<String>,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Summary format: `table` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Defaults to auto-detection.
    #[serde(default)]
    pub color: Option<bool>,

    /// Write result JSON on a single line.
    #[serde(default)]
    pub compact: bool,
}

impl KnitConfig {
    /// Load configuration from `.knitrc.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }

        Self::default()
    }

    /// Configured default strategy, if any.
    pub fn default_strategy(&self) -> Option<&str> {
        self.assembler.strategy.as_deref().filter(|s| !s.is_empty())
    }

    /// Configured batch thread count, if any.
    pub fn threads(&self) -> Option<usize> {
        self.assembler.threads
    }

    /// Configured reverse-edge suffix, if any.
    pub fn reverse_suffix(&self) -> Option<&str> {
        self.linker.reverse_suffix.as_deref()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn compact(&self) -> bool {
        self.output.compact
    }
}
