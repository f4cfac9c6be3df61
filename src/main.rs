//! dspec - behavior-driven spec runner
//!
//! Runs the bundled sample suite through the same driver an embedding test
//! binary would use.
//!
//! ## Usage
//!
//! ```bash
//! # Run the sample suite sequentially
//! dspec run
//!
//! # Fan root examples out to 4 forked workers, recording events
//! dspec run --fork --workers 4 --events events.jsonl
//!
//! # Print the spec tree, including the failing samples
//! dspec list --all
//!
//! # Show the DSPEC_* variables
//! dspec env
//! ```

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

mod cli;
mod demo;

use cli::Args;
use dspec::config::env::print_env_help;
use dspec::utils::{init_logger, LogLevel};
use dspec::{EngineConfig, EnvConfig, ExampleGroup, Reporter, Runner, SpecBuilder};

fn main() -> ExitCode {
    let args = Args::parse();
    let env = EnvConfig::load();

    let config = match load_config(&args, &env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut level = LogLevel::from_str(&config.log_level).unwrap_or_default();
    if args.verbose {
        level = level.more_verbose();
    }
    init_logger(level);
    debug!("configuration: {:?}", config);

    let result = match args.command {
        cli::Command::Run(run_args) => run_suite(config, run_args),
        cli::Command::List(list_args) => {
            list_suite(&config, list_args);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Env(env_args) => {
            if env_args.current {
                env.print_summary();
            } else {
                print_env_help();
            }
            Ok(ExitCode::SUCCESS)
        }
    };

    result.unwrap_or_else(|e| {
        error!("{:#}", e);
        ExitCode::FAILURE
    })
}

/// File, then environment; command flags are applied by each command
fn load_config(args: &Args, env: &EnvConfig) -> Result<EngineConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| env.config_file.clone().map(Into::into));
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    };
    Ok(config.with_env(env))
}

fn run_suite(mut config: EngineConfig, args: cli::RunArgs) -> Result<ExitCode> {
    if args.fork {
        config.fork = true;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(events) = args.events {
        config.events_file = Some(events);
    }

    let mut runner = Runner::new(config)?;
    let summary = runner.load(&demo::units(args.all)).run();

    println!("\n{summary}");

    Ok(if runner.has_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn list_suite(config: &EngineConfig, args: cli::ListArgs) {
    let root = SpecBuilder::load(
        &demo::units(args.all),
        ExampleGroup::new(config.suite_title.clone()),
        &Reporter::new(),
    );

    println!("\n{} examples\n", root.total());
    print!("{}", root.outline());
}
