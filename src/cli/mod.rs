//! Command-line parsing for the economic data pipeline.
//!
//! Argument parsing lives here; `app` turns the parsed arguments into a
//! [`crate::domain::PipelineConfig`] and dispatches.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_END_YEAR, DEFAULT_REFERENCE_YEAR, DEFAULT_START_YEAR, DEFAULT_TIMEOUT_SECS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "econ",
    version,
    about = "Scrape, fetch and reconcile country-level economic indicators"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape infobox pages into `raw_economic_data.csv`.
    Scrape(StageArgs),
    /// Fetch indicator time series into `worldbank_data.csv`.
    ///
    /// Entities are read from the scraped snapshot, so `scrape` must run first.
    Fetch(StageArgs),
    /// Join, derive and impute into the two `processed_*.csv` tables.
    Reconcile(StageArgs),
    /// Run scrape, fetch and reconcile in order (the default).
    Run(StageArgs),
}

/// Options shared by every stage; each stage ignores what it does not use.
#[derive(Debug, Parser, Clone)]
pub struct StageArgs {
    /// Directory holding every input and output CSV (env: ECON_DATA_DIR).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Worker threads for the scrape and fetch loops.
    #[arg(short = 'j', long, default_value_t = 1)]
    pub jobs: usize,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Year stamped on scraped snapshot records.
    #[arg(long, default_value_t = DEFAULT_REFERENCE_YEAR)]
    pub year: i32,

    /// First year fetched from the indicator API.
    #[arg(long, default_value_t = DEFAULT_START_YEAR)]
    pub start_year: i32,

    /// Last year fetched from the indicator API (inclusive).
    #[arg(long, default_value_t = DEFAULT_END_YEAR)]
    pub end_year: i32,

    /// Comma-separated page identifiers to scrape, e.g. `United_States,Japan`.
    #[arg(long, value_delimiter = ',', value_name = "LIST")]
    pub entities: Option<Vec<String>>,

    /// Base delay for API retries; doubles on each retry.
    #[arg(long, default_value_t = 1.0)]
    pub backoff_secs: f64,

    /// Per-request timeout.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Skip the connectivity probe before fetching.
    #[arg(long)]
    pub skip_probe: bool,
}
