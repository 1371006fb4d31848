//! Terminal summaries printed after each stage.
//!
//! Formatting lives here so the stages themselves only compute.

use std::path::Path;

use crate::domain::{SnapshotRecord, Table};
use crate::reconcile::Reconciled;

/// Summary of a scrape run.
pub fn format_scrape_summary(requested: usize, records: &[SnapshotRecord], path: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== econ scrape ===\n");
    out.push_str(&format!(
        "Entities: {} scraped / {} requested\n",
        records.len(),
        requested
    ));
    if records.is_empty() {
        out.push_str("No infobox data collected; wrote header only.\n");
    }
    out.push_str(&format!("Wrote: {}\n", path.display()));
    out
}

/// Summary of a fetch run.
pub fn format_fetch_summary(table: &Table, path: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== econ fetch ===\n");
    let countries = distinct_countries(table);
    out.push_str(&format!(
        "Rows: {} ({} countries, {} indicator columns)\n",
        table.len(),
        countries,
        table.width().saturating_sub(2)
    ));
    if table.is_empty() {
        out.push_str("No data collected; consider a cached dataset.\n");
    }
    out.push_str(&format!("Wrote: {}\n", path.display()));
    out
}

/// Summary of a reconcile run, including every warning raised.
pub fn format_reconcile_summary(run: &Reconciled, static_path: &Path, timeseries_path: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== econ reconcile ===\n");
    if let Some(year) = run.report.reference_year {
        out.push_str(&format!("Snapshot year: {year}\n"));
    }
    out.push_str(&format!(
        "Dataset size: {} countries, {} columns\n",
        run.static_table.len(),
        run.static_table.width()
    ));
    out.push_str(&format!(
        "Time series: {} rows, {} columns\n",
        run.timeseries.len(),
        run.timeseries.width()
    ));

    if !run.report.imputed.is_empty() {
        out.push_str("\nImputed (column mean):\n");
        for imp in &run.report.imputed {
            out.push_str(&format!("  {:<24} {:>3} filled  mean={:.4}\n", imp.column, imp.filled, imp.mean));
        }
    }

    if !run.report.warnings.is_empty() {
        out.push_str(&format!("\nWarnings ({}):\n", run.report.warnings.len()));
        for w in &run.report.warnings {
            out.push_str(&format!("  - {w}\n"));
        }
    }

    out.push_str(&format!(
        "\nWrote: {}\nWrote: {}\n",
        static_path.display(),
        timeseries_path.display()
    ));
    out
}

fn distinct_countries(table: &Table) -> usize {
    let Some(values) = table.column_values("Country") else {
        return 0;
    };
    let mut names: Vec<String> = values.map(|v| v.render()).collect();
    names.sort();
    names.dedup();
    names.len()
}
