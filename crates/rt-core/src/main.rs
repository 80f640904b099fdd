//! R_t Inference Core - CLI entry point
//!
//! Reads per-geography observation bundles from a JSON file, runs the
//! inference pipeline for each, and writes the merged result records as
//! JSON. Logs go to stderr; stdout carries only command payloads.

use clap::{Args, Parser, Subcommand};
use rt_core::config::load_config;
use rt_core::exit_codes::ExitCode;
use rt_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use rt_core::series::GeographyInput;
use rt_core::RtEngine;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// R_t inference over daily case, death, and hospitalization series
#[derive(Parser)]
#[command(name = "rt-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(long, global = true, env = "RT_CONFIG")]
    config: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, global = true, default_value = "human")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference for every geography in the input file
    Run(RunArgs),

    /// Validate a config file and print the resolved configuration
    CheckConfig,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON file with an array of geography input bundles
    #[arg(long)]
    input: PathBuf,

    /// Output file for result records (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&LogConfig {
        level: cli.global.log_level,
        format: cli.global.log_format,
    });

    let code = match cli.command {
        Commands::Run(args) => run(&cli.global, &args),
        Commands::CheckConfig => check_config(&cli.global),
    };
    code.into()
}

fn run(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let config = match load_config(global.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::ConfigError;
        }
    };
    let ref_date = config.ref_date;

    let engine = match RtEngine::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "failed to build engine");
            return ExitCode::ConfigError;
        }
    };

    let inputs: Vec<GeographyInput> = match read_inputs(&args.input) {
        Ok(inputs) => inputs,
        Err(code) => return code,
    };
    info!(geographies = inputs.len(), "starting batch run");

    let outcomes = engine.run_batch(&inputs);
    let mut records = Vec::new();
    let mut produced = 0usize;
    for outcome in &outcomes {
        match &outcome.table {
            Some(table) => {
                produced += 1;
                records.extend(table.to_records(ref_date));
            }
            None => warn!(fips = %outcome.fips, "no result for geography"),
        }
    }
    info!(
        produced,
        absent = outcomes.len() - produced,
        records = records.len(),
        "batch run finished"
    );

    let payload = serde_json::Value::Array(records);
    if let Err(err) = write_payload(args.output.as_deref(), &payload) {
        error!(error = %err, "failed to write results");
        return ExitCode::IoError;
    }

    if produced == 0 {
        ExitCode::NoResults
    } else {
        ExitCode::Clean
    }
}

fn check_config(global: &GlobalOpts) -> ExitCode {
    match load_config(global.config.as_deref()) {
        Ok(config) => match serde_json::to_string_pretty(&config) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::Clean
            }
            Err(err) => {
                error!(error = %err, "failed to serialize configuration");
                ExitCode::IoError
            }
        },
        Err(err) => {
            error!(error = %err, "invalid configuration");
            ExitCode::ConfigError
        }
    }
}

fn read_inputs(path: &std::path::Path) -> Result<Vec<GeographyInput>, ExitCode> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to read input file");
        ExitCode::IoError
    })?;
    serde_json::from_str(&text).map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to parse input file");
        ExitCode::IoError
    })
}

fn write_payload(
    path: Option<&std::path::Path>,
    payload: &serde_json::Value,
) -> std::io::Result<()> {
    let text = serde_json::to_string_pretty(payload)?;
    match path {
        Some(path) => std::fs::write(path, text),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}
