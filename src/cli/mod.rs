//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Behavior-driven spec runner
#[derive(Parser, Debug)]
#[command(name = "dspec")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.4")]
#[command(about = "Run behavior-driven spec suites")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bundled spec suite
    Run(RunArgs),

    /// Print the spec tree
    List(ListArgs),

    /// Show recognized environment variables
    Env(EnvArgs),
}

/// Arguments for run command
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Fan root examples out to forked workers
    #[arg(short, long)]
    pub fork: bool,

    /// Number of workers when forking
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Append engine events as JSON lines to this file
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Include the failing and disabled sample units
    #[arg(long)]
    pub all: bool,
}

/// Arguments for list command
#[derive(ClapArgs, Debug, Default)]
pub struct ListArgs {
    /// Include the failing and disabled sample units
    #[arg(long)]
    pub all: bool,
}

/// Arguments for env command
#[derive(ClapArgs, Debug, Default)]
pub struct EnvArgs {
    /// Show current values instead of help
    #[arg(long)]
    pub current: bool,
}
