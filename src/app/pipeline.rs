//! Stage runners shared by the CLI subcommands and the integration tests.
//!
//! Each stage reads its inputs from the data directory, does its work through
//! an injected [`HttpTransport`], and persists its output:
//! scrape -> `raw_economic_data.csv` -> fetch -> `worldbank_data.csv` -> reconcile
//!
//! The front-end only decides which stages to run and prints the summaries.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::data::{HttpTransport, InfoboxScraper, WorldBankFetcher};
use crate::domain::{PipelineConfig, SnapshotRecord, Table};
use crate::error::AppError;
use crate::io::export::{write_snapshot_csv, write_table};
use crate::io::ingest::read_table;
use crate::reconcile::{COUNTRY, Reconciled, reconcile};

#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub requested: usize,
    pub records: Vec<SnapshotRecord>,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FetchRun {
    pub table: Table,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReconcileRun {
    pub output: Reconciled,
    pub static_path: PathBuf,
    pub timeseries_path: PathBuf,
}

/// Outputs of `econ run`.
#[derive(Debug, Clone)]
pub struct FullRun {
    pub scrape: ScrapeRun,
    pub fetch: FetchRun,
    pub reconcile: ReconcileRun,
}

/// Scrape every configured entity and write the raw snapshot.
pub fn run_scrape<T: HttpTransport>(config: &PipelineConfig, transport: T) -> Result<ScrapeRun, AppError> {
    info!(entities = config.entities.len(), year = config.reference_year, "scrape started");
    let scraper = InfoboxScraper::new(transport, &config.wiki_base_url, config.reference_year);
    let records = scraper.scrape_all(&config.entities, config.jobs)?;

    let path = config.raw_snapshot_path();
    write_snapshot_csv(&path, &records)?;

    Ok(ScrapeRun {
        requested: config.entities.len(),
        records,
        path,
    })
}

/// Fetch the time series for every entity present in the raw snapshot.
pub fn run_fetch<T: HttpTransport>(config: &PipelineConfig, transport: T) -> Result<FetchRun, AppError> {
    let snapshot = read_table(&config.raw_snapshot_path(), "Run `econ scrape` first.")?;
    let entities = snapshot_entities(&snapshot);
    info!(
        entities = entities.len(),
        start = config.years.start,
        end = config.years.end,
        indicators = config.indicators.len(),
        "fetch started"
    );

    let fetcher = WorldBankFetcher::new(
        transport,
        &config.api_base_url,
        config.country_codes.clone(),
        config.retry.into(),
    );
    if config.probe {
        fetcher.probe();
    }
    let table = fetcher.fetch(&entities, &config.indicators, config.years, config.jobs)?;

    let path = config.raw_timeseries_path();
    write_table(&path, &table)?;

    Ok(FetchRun { table, path })
}

/// Reconcile the two raw tables and write the canonical outputs.
pub fn run_reconcile(config: &PipelineConfig) -> Result<ReconcileRun, AppError> {
    let snapshot = read_table(&config.raw_snapshot_path(), "Run `econ scrape` first.")?;
    let timeseries = read_table(&config.raw_timeseries_path(), "Run `econ fetch` first.")?;

    let output = reconcile(snapshot, timeseries);
    for w in &output.report.warnings {
        warn!(warning = %w, "reconcile");
    }
    for imp in &output.report.imputed {
        debug!(column = %imp.column, filled = imp.filled, mean = imp.mean, "imputed");
    }

    let static_path = config.canonical_static_path();
    let timeseries_path = config.canonical_timeseries_path();
    write_table(&static_path, &output.static_table)?;
    write_table(&timeseries_path, &output.timeseries)?;
    info!(
        rows = output.static_table.len(),
        columns = output.static_table.width(),
        "reconcile finished"
    );

    Ok(ReconcileRun {
        output,
        static_path,
        timeseries_path,
    })
}

/// Run all three stages in order over one transport.
pub fn run_all<T: HttpTransport>(config: &PipelineConfig, transport: T) -> Result<FullRun, AppError> {
    let scrape = run_scrape(config, &transport)?;
    let fetch = run_fetch(config, &transport)?;
    let reconcile = run_reconcile(config)?;
    Ok(FullRun {
        scrape,
        fetch,
        reconcile,
    })
}

/// Distinct `Country` values of the raw snapshot, in file order.
fn snapshot_entities(snapshot: &Table) -> Vec<String> {
    let Some(values) = snapshot.column_values(COUNTRY) else {
        warn!("raw snapshot has no `Country` column; nothing to fetch");
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for name in values.map(|v| v.render()) {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
