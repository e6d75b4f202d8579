//! Command line entry point.
//!
//! Exit codes: 0 when every reference check passes, 1 when any check fails,
//! 2 when the run aborts (configuration, fetch or export error).

use anyhow::{Context, Result};
use cbs_renewables::analysis::classify::ClassifierStrategy;
use cbs_renewables::categories;
use cbs_renewables::config::Config;
use cbs_renewables::ingest::cbs::{self, HttpPageSource};
use cbs_renewables::logging::{self, LogLevel};
use cbs_renewables::model::FetchError;
use cbs_renewables::pipeline::{self, PipelineError};
use cbs_renewables::verify;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Debug, Parser)]
#[command(version, about = "Fetch CBS renewable electricity data, export to XLSX and verify")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workbook path (overrides config and CBS_OUTPUT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How records are mapped to energy sources
    #[arg(long, value_enum, default_value_t = ClassifierStrategy::Static)]
    strategy: ClassifierStrategy,

    /// Also write the verification report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Append log lines to this file
    #[arg(long)]
    log_file: Option<String>,

    /// Debug logging with timestamps
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the dataset's energy source keys and titles
    Codes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    logging::init_logger(level, cli.log_file.as_deref(), cli.verbose);

    let result = match cli.command {
        Some(Command::Codes) => list_codes(&cli).map(|()| true),
        None => run(&cli),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            match fetch_failure(&e) {
                Some(fetch) => {
                    logging::log_fetch_failure(fetch);
                }
                None => error!("{:#}", e),
            }
            ExitCode::from(2)
        }
    }
}

/// The fetch error behind `e`, if any; those are logged with their
/// classification instead of as a plain error chain.
fn fetch_failure(e: &anyhow::Error) -> Option<&FetchError> {
    e.downcast_ref::<FetchError>().or_else(|| match e.downcast_ref::<PipelineError>() {
        Some(PipelineError::Fetch(fetch)) => Some(fetch),
        _ => None,
    })
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_env();
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Runs the full pipeline; `Ok(false)` means verification failed.
fn run(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;
    let source = HttpPageSource::new(config.request_timeout())?;

    let run = pipeline::run_pipeline(&source, &config, cli.strategy)?;

    verify::print_summary(&run.report);
    if let Some(path) = &cli.report_json {
        run.report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(run.report.passed())
}

fn list_codes(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let source = HttpPageSource::new(config.request_timeout())?;
    let codes = cbs::fetch_energy_source_codes(&source, &config.source, config.retry_policy())?;
    println!("{:<10} {:<15} {}", "Key", "Exported as", "Title");
    for code in codes {
        let exported = categories::find_by_code(&code.key)
            .map(|k| k.source.sheet_name())
            .unwrap_or("");
        println!("{:<10} {:<15} {}", code.key.trim(), exported, code.title);
    }
    Ok(())
}
