//! seam-lint CLI tool.
//!
//! Usage:
//! ```bash
//! seam-lint check [OPTIONS] [PATH]
//! seam-lint list-rules
//! seam-lint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Flags interface calls whose concrete receiver lives outside the interface's package
#[derive(Parser)]
#[command(name = "seam-lint")]
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
    /// Run lint checks over `*.unit.json` files
    Check {
        /// Directory holding unit files (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Package declaring the interface (short name, path suffix, or import path)
        #[arg(long, env = "SEAM_LINT_INTERFACE_PACKAGE")]
        interface_package: Option<String>,

        /// Name of the interface
        #[arg(long, env = "SEAM_LINT_INTERFACE_NAME")]
        interface_name: Option<String>,
    },

    /// List available rules
    ListRules,

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
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            exclude,
            interface_package,
            interface_name,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            let target = commands::check::Target {
                interface_package,
                interface_name,
            };
            let failed = commands::check::run(&path, format, exclude, target, &source)?;
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::ListRules => {
            commands::list_rules::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
