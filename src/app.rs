//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging
//! - resolves a validated `PipelineConfig`
//! - runs the requested stage(s) and prints their summaries

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cli::{Command, StageArgs};
use crate::data::ReqwestTransport;
use crate::domain::{PipelineConfig, RetrySettings, YearRange};
use crate::error::AppError;

pub mod pipeline;

pub const ENV_DATA_DIR: &str = "ECON_DATA_DIR";
pub const ENV_WIKI_BASE_URL: &str = "ECON_WIKI_BASE_URL";
pub const ENV_API_BASE_URL: &str = "ECON_API_BASE_URL";
pub const ENV_USER_AGENT: &str = "ECON_USER_AGENT";

/// Entry point for the `econ` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the normal case.
    dotenvy::dotenv().ok();

    // `econ` with no subcommand runs the whole pipeline.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let (Command::Scrape(args) | Command::Fetch(args) | Command::Reconcile(args) | Command::Run(args)) =
        &cli.command;
    crate::logging::init(args.verbose, args.log_json)?;
    let config = config_from_args(args)?;

    match cli.command {
        Command::Scrape(_) => handle_scrape(&config),
        Command::Fetch(_) => handle_fetch(&config),
        Command::Reconcile(_) => handle_reconcile(&config),
        Command::Run(_) => handle_run(&config),
    }
}

fn transport(config: &PipelineConfig) -> Result<ReqwestTransport, AppError> {
    ReqwestTransport::new(&config.user_agent, config.timeout)
}

fn handle_scrape(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_scrape(config, transport(config)?)?;
    println!(
        "{}",
        crate::report::format_scrape_summary(run.requested, &run.records, &run.path)
    );
    Ok(())
}

fn handle_fetch(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_fetch(config, transport(config)?)?;
    println!("{}", crate::report::format_fetch_summary(&run.table, &run.path));
    Ok(())
}

fn handle_reconcile(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_reconcile(config)?;
    println!(
        "{}",
        crate::report::format_reconcile_summary(&run.output, &run.static_path, &run.timeseries_path)
    );
    Ok(())
}

fn handle_run(config: &PipelineConfig) -> Result<(), AppError> {
    let run = pipeline::run_all(config, transport(config)?)?;
    println!(
        "{}",
        crate::report::format_scrape_summary(run.scrape.requested, &run.scrape.records, &run.scrape.path)
    );
    println!(
        "{}",
        crate::report::format_fetch_summary(&run.fetch.table, &run.fetch.path)
    );
    println!(
        "{}",
        crate::report::format_reconcile_summary(
            &run.reconcile.output,
            &run.reconcile.static_path,
            &run.reconcile.timeseries_path
        )
    );
    Ok(())
}

/// Resolve CLI arguments plus `ECON_*` environment variables.
pub fn config_from_args(args: &StageArgs) -> Result<PipelineConfig, AppError> {
    resolve_config(args, |key| std::env::var(key).ok())
}

/// Precedence: CLI flag, then environment, then built-in default.
fn resolve_config(args: &StageArgs, env: impl Fn(&str) -> Option<String>) -> Result<PipelineConfig, AppError> {
    let defaults = PipelineConfig::default();

    if !args.backoff_secs.is_finite() || args.backoff_secs < 0.0 {
        return Err(AppError::config("`--backoff-secs` must be a non-negative number."));
    }

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => env(ENV_DATA_DIR).map(PathBuf::from).unwrap_or(defaults.data_dir),
    };

    let entities = match &args.entities {
        Some(list) => list
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect(),
        None => defaults.entities,
    };

    let config = PipelineConfig {
        data_dir,
        entities,
        reference_year: args.year,
        years: YearRange::new(args.start_year, args.end_year)?,
        wiki_base_url: env(ENV_WIKI_BASE_URL).unwrap_or(defaults.wiki_base_url),
        api_base_url: env(ENV_API_BASE_URL).unwrap_or(defaults.api_base_url),
        user_agent: env(ENV_USER_AGENT).unwrap_or(defaults.user_agent),
        timeout: Duration::from_secs(args.timeout_secs),
        retry: RetrySettings {
            backoff_factor: Duration::from_secs_f64(args.backoff_secs),
            ..RetrySettings::default()
        },
        jobs: args.jobs,
        probe: !args.skip_probe,
        ..defaults
    };
    config.validate()?;
    Ok(config)
}

/// Rewrite argv so `econ` defaults to `econ run`.
///
/// Rules:
/// - `econ`                       -> `econ run`
/// - `econ -j 4 ...`              -> `econ run -j 4 ...`
/// - `econ --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}
