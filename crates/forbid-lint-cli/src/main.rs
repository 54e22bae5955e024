//! forbid-lint CLI tool.
//!
//! Usage:
//! ```bash
//! forbid-lint check [OPTIONS] [PATH]
//! forbid-lint list-patterns [PATH]
//! forbid-lint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Forbids identifiers and member accesses in Rust sources
#[derive(Parser)]
#[command(name = "forbid-lint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report forbidden identifiers
    Check {
        /// Path to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Forbidden pattern, added to the configured ones (repeatable)
        #[arg(short, long = "pattern", value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Also check example functions in test files
        #[arg(long)]
        examples: bool,

        /// Honor `permit:` comments
        #[arg(long, value_name = "BOOL")]
        permit: Option<bool>,

        /// Resolve symbols so that package-scoped patterns can match
        #[arg(long)]
        analyze_types: bool,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// List the patterns a check would use
    ListPatterns {
        /// Project directory used to locate the configuration
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
    /// `use of ... forbidden ... at file:line:col` lines.
    Plain,
    /// Source snippets rendered with miette.
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            patterns,
            examples,
            permit,
            analyze_types,
            exclude,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            let overrides = commands::check::Overrides {
                patterns,
                include_examples: examples,
                use_permit_directives: permit,
                analyze_types,
            };
            let failed = commands::check::run(&path, format, &overrides, exclude, &source)?;
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::ListPatterns { path } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            commands::list_patterns::run(&source)
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
