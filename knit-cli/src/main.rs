//! Knit CLI - Command-line interface for graph assembly
//!
//! Reads node payloads (a JSON object with `nodes`, or a bare array), picks a
//! builder by strategy and writes linked graphs, Cypher statements or vector
//! payloads.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::*;
use config::KnitConfig;
use knit_core::builders::{GraphBuilder, HierarchyBuilder, LinkerOptions};
use knit_core::{registry, Assembler, AUTO};
use output::OutputFormat;

/// Assemble tagged node lists into linked graphs.
#[derive(Parser)]
#[command(name = "knit")]
#[command(author, version)]
#[command(about = "Assemble tagged node lists into linked graphs")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  knit build nodes.json -o graph.json      Link nodes with the best-scoring builder
  knit build nodes.json -s cypher          Emit MERGE statements
  cat nodes.json | knit build -            Read the payload from stdin
  knit score nodes.json                    Show how each builder scores the input
  knit batch a.json b.json -d out/         Assemble several files in parallel")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Report format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble one payload and write the result
    #[command(visible_alias = "b")]
    Build {
        /// Input JSON file, or '-' for stdin
        input: String,

        /// Builder strategy name, or 'auto' to let builders score the input
        #[arg(short, long, env = "KNIT_STRATEGY")]
        strategy: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write JSON results on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Show the resolver's score table for a payload
    Score {
        /// Input JSON file, or '-' for stdin
        input: String,

        /// Strategy hint to resolve
        #[arg(short, long, env = "KNIT_STRATEGY")]
        strategy: Option<String>,
    },

    /// List registered builders and their strategy names
    #[command(visible_alias = "ls")]
    Strategies,

    /// Assemble several payloads in parallel
    Batch {
        /// Input JSON files
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Builder strategy name, or 'auto'
        #[arg(short, long, env = "KNIT_STRATEGY")]
        strategy: Option<String>,

        /// Assemble the union of all inputs in one run
        #[arg(long)]
        merge: bool,

        /// Worker threads (default: one per CPU)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Write one result file per input into this directory
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,

        /// Write JSON results on a single line
        #[arg(long)]
        compact: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Replace the default linkers when the config asks for another reverse suffix.
fn register_linkers(config: &KnitConfig) {
    if let Some(suffix) = config.reverse_suffix() {
        let options = LinkerOptions::with_reverse_suffix(suffix);
        registry::register_global(Arc::new(GraphBuilder::with_options(options.clone())));
        registry::register_global(Arc::new(HierarchyBuilder::with_options(options)));
        tracing::debug!("Registered linkers with reverse suffix '{}'", suffix);
    }
}

/// Strategy precedence: flag or `KNIT_STRATEGY` > config > `auto`.
fn resolve_strategy(flag: Option<String>, config: &KnitConfig) -> String {
    flag.filter(|s| !s.is_empty())
        .or_else(|| config.default_strategy().map(str::to_string))
        .unwrap_or_else(|| AUTO.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .knitrc.toml
    let config = KnitConfig::load(Path::new("."));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    // Apply color override from config if set
    output::set_color_override(config.use_color());

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    register_linkers(&config);
    let assembler = Assembler::new();

    match command {
        Commands::Build {
            input,
            strategy,
            output,
            compact,
        } => build::run(
            &assembler,
            &input,
            &resolve_strategy(strategy, &config),
            output.as_deref(),
            compact || config.compact(),
            format,
            cli.quiet,
        ),
        Commands::Score { input, strategy } => {
            score::run(&assembler, &input, &resolve_strategy(strategy, &config), format)
        }
        Commands::Strategies => strategies::run(&assembler, format),
        Commands::Batch {
            inputs,
            strategy,
            merge,
            threads,
            out_dir,
            compact,
        } => {
            let strategy = resolve_strategy(strategy, &config);
            let options = batch::BatchOptions {
                strategy: &strategy,
                merge,
                threads: threads.or(config.threads()),
                out_dir: out_dir.as_deref(),
                compact: compact || config.compact(),
                format,
                quiet: cli.quiet,
            };
            batch::run(&assembler, &inputs, &options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_strategy_precedence() {
        let config: KnitConfig = toml::from_str("[assembler]\nstrategy = \"hierarchy\"\n").unwrap();
        assert_eq!(resolve_strategy(Some("cypher".to_string()), &config), "cypher");
        assert_eq!(resolve_strategy(None, &config), "hierarchy");
        assert_eq!(resolve_strategy(Some(String::new()), &config), "hierarchy");
        assert_eq!(resolve_strategy(None, &KnitConfig::default()), AUTO);
    }

    #[test]
    fn test_batch_args() {
        let cli = Cli::try_parse_from(["knit", "batch", "a.json", "b.json", "--merge", "-j", "2", "-d", "out"]).unwrap();
        match cli.command {
            Some(Commands::Batch {
                inputs,
                merge,
                threads,
                out_dir,
                ..
            }) => {
                assert_eq!(inputs, vec!["a.json", "b.json"]);
                assert!(merge);
                assert_eq!(threads, Some(2));
                assert_eq!(out_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected batch command"),
        }
    }
}
