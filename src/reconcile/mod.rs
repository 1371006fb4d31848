//! Reconciliation of the scraped snapshot with the API time series.
//!
//! Produces the two canonical tables:
//!
//! - static: latest-year snapshot ⟕ time series on (`Country`, `Year`), plus
//!   `GDP_Per_Capita_Calc`, mean-imputed and pruned of free-text columns
//! - time series: the fetched table with `date` renamed to `Year`
//!
//! Every schema problem here is a warning, never an error: the output is
//! whatever can be computed from the columns that are present.

use std::collections::HashMap;
use std::fmt;

use crate::domain::{Imputation, Table, Value, normalize_entity_name};

pub const COUNTRY: &str = "Country";
pub const YEAR: &str = "Year";
pub const DATE: &str = "date";
pub const GDP_CURRENT: &str = "GDP_Current_USD";
pub const POPULATION_TS: &str = "Population_WB";
pub const POPULATION_SNAPSHOT: &str = "Population";
pub const GDP_PER_CAPITA_CALC: &str = "GDP_Per_Capita_Calc";

/// Suffix for time-series columns whose name collides with a snapshot column.
pub const COLLISION_SUFFIX: &str = "_ts";

pub const SNAPSHOT_REQUIRED: [&str; 12] = [
    "Country",
    "Year",
    "Currency",
    "Population",
    "GDP_Growth",
    "GDP_Per_Capita",
    "Inflation_Rate",
    "Gini_Coefficient",
    "Labor_Force",
    "Unemployment_Rate",
    "Main_Sectors",
    "Foreign_Reserves",
];

pub const TIMESERIES_REQUIRED: [&str; 11] = [
    "Country",
    "date",
    "GDP_Current_USD",
    "GDP_Per_Capita_USD",
    "Inflation_Rate_WB",
    "Unemployment_Rate_WB",
    "GDP_Per_Capita_Growth",
    "Exports_WB",
    "Imports_WB",
    "Gini_Coefficient_WB",
    "Population_WB",
];

/// Dropped from the static output only.
pub const PRUNED_COLUMNS: [&str; 2] = ["Currency", "Main_Sectors"];

/// Non-fatal conditions found while reconciling.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileWarning {
    MissingColumns { table: &'static str, columns: Vec<String> },
    /// The snapshot has no usable `Year`; all rows were kept.
    NoSnapshotYear,
    /// The join could not run; the snapshot passes through alone.
    JoinSkipped(String),
    /// Snapshot entity with no time-series row for its year.
    JoinMiss { entity: String },
    /// `GDP_Per_Capita_Calc` was not computed.
    DerivedMetricSkipped { missing: Vec<String> },
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileWarning::MissingColumns { table, columns } => {
                write!(f, "missing columns in {table}: {}", columns.join(", "))
            }
            ReconcileWarning::NoSnapshotYear => {
                write!(f, "no `Year` column in snapshot; using all rows")
            }
            ReconcileWarning::JoinSkipped(reason) => write!(f, "join skipped: {reason}"),
            ReconcileWarning::JoinMiss { entity } => {
                write!(f, "no time-series row for {entity}; time-series columns left empty")
            }
            ReconcileWarning::DerivedMetricSkipped { missing } => write!(
                f,
                "cannot compute {GDP_PER_CAPITA_CALC}: missing {}",
                missing.join(" and ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub warnings: Vec<ReconcileWarning>,
    /// Year the snapshot was filtered to, if any.
    pub reference_year: Option<f64>,
    pub imputed: Vec<Imputation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub static_table: Table,
    pub timeseries: Table,
    pub report: ReconcileReport,
}

/// Run every reconciliation step on the raw inputs.
pub fn reconcile(mut snapshot: Table, mut timeseries: Table) -> Reconciled {
    let mut report = ReconcileReport::default();

    check_columns(&snapshot, &SNAPSHOT_REQUIRED, "snapshot", &mut report);
    check_columns(&timeseries, &TIMESERIES_REQUIRED, "time series", &mut report);

    snapshot.rename_columns_with(|c| c.trim().replace(' ', "_"));
    timeseries.rename_column(DATE, YEAR);

    report.reference_year = filter_latest_year(&mut snapshot);
    if report.reference_year.is_none() {
        report.warnings.push(ReconcileWarning::NoSnapshotYear);
    }

    normalize_names(&mut snapshot);
    normalize_names(&mut timeseries);

    let mut merged = left_join(&snapshot, &timeseries, &mut report);

    if let Some(missing) = add_gdp_per_capita(&mut merged) {
        report
            .warnings
            .push(ReconcileWarning::DerivedMetricSkipped { missing });
    }

    report.imputed = merged.impute_column_means();
    merged.drop_columns(&PRUNED_COLUMNS);

    Reconciled {
        static_table: merged,
        timeseries,
        report,
    }
}

fn check_columns(table: &Table, required: &[&str], name: &'static str, report: &mut ReconcileReport) {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        report.warnings.push(ReconcileWarning::MissingColumns {
            table: name,
            columns: missing,
        });
    }
}

/// Keep only rows of the maximum `Year`. Returns that year, or `None` when
/// there is no numeric year to filter on (rows are left untouched).
fn filter_latest_year(snapshot: &mut Table) -> Option<f64> {
    let idx = snapshot.column_index(YEAR)?;
    if !snapshot.is_numeric_column(idx) {
        return None;
    }
    let max = snapshot
        .rows()
        .iter()
        .filter_map(|r| r[idx].as_f64())
        .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |m| m.max(y))))?;
    snapshot.retain_rows(|r| r[idx].as_f64() == Some(max));
    Some(max)
}

fn normalize_names(table: &mut Table) {
    table.map_column(COUNTRY, |v| match v {
        Value::Text(s) => Value::Text(normalize_entity_name(s)),
        other => other.clone(),
    });
}

/// Join key for a year cell; numbers render canonically so `2023` and `2023.0`
/// from different sources compare equal.
fn year_key(v: &Value) -> String {
    v.render()
}

fn left_join(snapshot: &Table, timeseries: &Table, report: &mut ReconcileReport) -> Table {
    let (Some(l_country), Some(r_country), Some(r_year)) = (
        snapshot.column_index(COUNTRY),
        timeseries.column_index(COUNTRY),
        timeseries.column_index(YEAR),
    ) else {
        report.warnings.push(ReconcileWarning::JoinSkipped(
            "`Country`/`Year` missing from one of the inputs".to_string(),
        ));
        return snapshot.clone();
    };
    let l_year = snapshot.column_index(YEAR);

    // Right-side lookup: first row wins for a duplicated key. Without a
    // snapshot year, match each entity against its latest time-series year.
    let mut by_key: HashMap<(String, String), usize> = HashMap::new();
    let mut latest: HashMap<String, (f64, usize)> = HashMap::new();
    for (i, row) in timeseries.rows().iter().enumerate() {
        let country = row[r_country].render();
        by_key
            .entry((country.clone(), year_key(&row[r_year])))
            .or_insert(i);
        if let Some(y) = row[r_year].as_f64() {
            let e = latest.entry(country).or_insert((y, i));
            if y > e.0 {
                *e = (y, i);
            }
        }
    }

    let right_cols: Vec<usize> = (0..timeseries.width())
        .filter(|&i| i != r_country && i != r_year)
        .collect();

    let mut columns: Vec<String> = snapshot.columns().to_vec();
    for &i in &right_cols {
        let name = &timeseries.columns()[i];
        if snapshot.has_column(name) {
            columns.push(format!("{name}{COLLISION_SUFFIX}"));
        } else {
            columns.push(name.clone());
        }
    }

    let mut merged = Table::new(columns);
    for row in snapshot.rows() {
        let country = row[l_country].render();
        let hit = match l_year {
            Some(ly) => by_key.get(&(country.clone(), year_key(&row[ly]))).copied(),
            None => latest.get(&country).map(|(_, i)| *i),
        };
        if hit.is_none() {
            report.warnings.push(ReconcileWarning::JoinMiss { entity: country });
        }

        let mut out = row.clone();
        match hit {
            Some(ri) => {
                let right = &timeseries.rows()[ri];
                out.extend(right_cols.iter().map(|&i| right[i].clone()));
            }
            None => out.extend(right_cols.iter().map(|_| Value::Null)),
        }
        merged.push_row(out);
    }
    merged
}

/// Add `GDP_Per_Capita_Calc = GDP_Current_USD / population`.
///
/// The population column is chosen once for the whole table: `Population_WB`
/// (a head count) unless it is absent or null in every row, then the
/// snapshot's `Population`. Units never mix within the column; a null in the
/// chosen column gives a null result. Returns the missing inputs when the
/// column cannot be computed at all, in which case it is not added.
fn add_gdp_per_capita(merged: &mut Table) -> Option<Vec<String>> {
    let gdp = merged.column_index(GDP_CURRENT);
    let pop_ts = merged.column_index(POPULATION_TS);
    let pop_snap = merged.column_index(POPULATION_SNAPSHOT);

    let Some(gdp) = gdp.filter(|_| pop_ts.is_some() || pop_snap.is_some()) else {
        let mut missing = Vec::new();
        if gdp.is_none() {
            missing.push(GDP_CURRENT.to_string());
        }
        if pop_ts.is_none() && pop_snap.is_none() {
            missing.push(POPULATION_TS.to_string());
        }
        return Some(missing);
    };

    let pop = pop_ts
        .filter(|&i| merged.rows().iter().any(|r| !r[i].is_null()))
        .or(pop_snap)
        .or(pop_ts);

    let values: Vec<Value> = merged
        .rows()
        .iter()
        .map(|row| {
            let population = pop.and_then(|i| row[i].as_f64());
            match (row[gdp].as_f64(), population) {
                (Some(g), Some(p)) if p != 0.0 => Value::from_f64(Some(g / p)),
                _ => Value::Null,
            }
        })
        .collect();

    merged.add_column(GDP_PER_CAPITA_CALC, values);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn num(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn testland_gets_gdp_per_capita() {
        let mut snapshot = Table::new(["Country", "Year", "Population"]);
        snapshot.push_row(vec![text("Testland"), num(2023.0), num(10.0)]);
        let mut ts = Table::new(["Country", "Year", "GDP_Current_USD"]);
        ts.push_row(vec![text("Testland"), num(2023.0), num(100.0)]);

        let out = reconcile(snapshot, ts);

        assert_eq!(out.static_table.value(0, GDP_PER_CAPITA_CALC), Some(&num(10.0)));
    }

    #[test]
    fn time_series_population_is_authoritative() {
        let mut snapshot = Table::new(["Country", "Year", "Population"]);
        snapshot.push_row(vec![text("Testland"), num(2023.0), num(10.0)]);
        let mut ts = Table::new(["Country", "date", "GDP_Current_USD", "Population_WB"]);
        ts.push_row(vec![text("Testland"), num(2023.0), num(100.0), num(4.0)]);

        let out = reconcile(snapshot, ts);

        assert_eq!(out.static_table.value(0, GDP_PER_CAPITA_CALC), Some(&num(25.0)));
    }

    #[test]
    fn missing_head_count_does_not_fall_back_to_millions() {
        let mut snapshot = Table::new(["Country", "Year", "Population"]);
        snapshot.push_row(vec![text("A"), num(2023.0), num(1.0)]);
        snapshot.push_row(vec![text("B"), num(2023.0), num(2.0)]);
        let mut ts = Table::new(["Country", "date", "GDP_Current_USD", "Population_WB"]);
        ts.push_row(vec![text("A"), num(2023.0), num(1e10), num(1e6)]);
        ts.push_row(vec![text("B"), num(2023.0), num(2e10), Value::Null]);

        let mut ts_by_year = ts.clone();
        ts_by_year.rename_column(DATE, YEAR);
        let mut merged = left_join(&snapshot, &ts_by_year, &mut ReconcileReport::default());
        assert!(add_gdp_per_capita(&mut merged).is_none());
        assert_eq!(merged.value(0, GDP_PER_CAPITA_CALC), Some(&num(10000.0)));
        assert_eq!(merged.value(1, GDP_PER_CAPITA_CALC), Some(&Value::Null));

        let out = reconcile(snapshot, ts);
        assert_eq!(out.static_table.value(1, GDP_PER_CAPITA_CALC), Some(&num(10000.0)));
    }

    #[test]
    fn join_miss_leaves_numeric_columns_null_before_imputation() {
        let mut snapshot = Table::new(["Country", "Year"]);
        snapshot.push_row(vec![text("Testland"), num(2023.0)]);
        snapshot.push_row(vec![text("Lonely Island"), num(2023.0)]);
        let mut ts = Table::new(["Country", "Year", "Exports_WB"]);
        ts.push_row(vec![text("Testland"), num(2023.0), num(7.0)]);
        let mut report = ReconcileReport::default();

        let merged = left_join(&snapshot, &ts, &mut report);

        assert_eq!(merged.value(0, "Exports_WB"), Some(&num(7.0)));
        assert_eq!(merged.value(1, "Exports_WB"), Some(&Value::Null));
        assert_eq!(
            report.warnings,
            vec![ReconcileWarning::JoinMiss {
                entity: "Lonely Island".to_string()
            }]
        );
    }

    #[test]
    fn snapshot_only_entity_survives_with_empty_time_series_columns() {
        let mut snapshot = Table::new(["Country", "Year", "Currency"]);
        snapshot.push_row(vec![text("testland"), num(2023.0), text("TLD")]);
        snapshot.push_row(vec![text("lonely_island"), num(2023.0), text("LID")]);
        let mut ts = Table::new(["Country", "date", "Exports_WB", "Label"]);
        ts.push_row(vec![text("Testland"), num(2023.0), num(7.0), text("x")]);

        let out = reconcile(snapshot, ts);
        let t = &out.static_table;

        assert_eq!(t.len(), 2);
        assert_eq!(t.value(1, "Country"), Some(&text("Lonely Island")));
        // Text column: not imputed, so the join miss stays visible.
        assert_eq!(t.value(1, "Label"), Some(&Value::Null));
        // Numeric column: imputed from the one matched row.
        assert_eq!(t.value(1, "Exports_WB"), Some(&num(7.0)));
        assert!(out.report.warnings.contains(&ReconcileWarning::JoinMiss {
            entity: "Lonely Island".to_string()
        }));
        assert!(!t.has_column("Currency"));
    }

    #[test]
    fn only_the_latest_snapshot_year_is_kept() {
        let mut snapshot = Table::new(["Country", "Year"]);
        snapshot.push_row(vec![text("A"), num(2022.0)]);
        snapshot.push_row(vec![text("A"), num(2023.0)]);
        snapshot.push_row(vec![text("B"), num(2023.0)]);

        let out = reconcile(snapshot, Table::new(["Country", "date"]));

        assert_eq!(out.report.reference_year, Some(2023.0));
        assert_eq!(out.static_table.len(), 2);
    }

    #[test]
    fn missing_year_passes_through_and_joins_on_latest() {
        let mut snapshot = Table::new(["Country", "GDP_Growth"]);
        snapshot.push_row(vec![text("A"), num(1.0)]);
        let mut ts = Table::new(["Country", "date", "GDP_Current_USD"]);
        ts.push_row(vec![text("A"), num(2022.0), num(5.0)]);
        ts.push_row(vec![text("A"), num(2023.0), num(6.0)]);

        let out = reconcile(snapshot, ts);

        assert!(out.report.warnings.contains(&ReconcileWarning::NoSnapshotYear));
        assert_eq!(out.static_table.value(0, "GDP_Current_USD"), Some(&num(6.0)));
    }

    #[test]
    fn derived_metric_is_omitted_without_inputs() {
        let mut snapshot = Table::new(["Country", "Year"]);
        snapshot.push_row(vec![text("A"), num(2023.0)]);
        let out = reconcile(snapshot, Table::new(["Country", "date", "Exports_WB"]));

        assert!(!out.static_table.has_column(GDP_PER_CAPITA_CALC));
        assert!(out.report.warnings.iter().any(|w| matches!(
            w,
            ReconcileWarning::DerivedMetricSkipped { missing } if missing.len() == 2
        )));
    }

    #[test]
    fn nulls_are_imputed_with_the_merged_mean() {
        let mut snapshot = Table::new(["Country", "Year", "Gini_Coefficient"]);
        snapshot.push_row(vec![text("A"), num(2023.0), num(10.0)]);
        snapshot.push_row(vec![text("B"), num(2023.0), Value::Null]);
        snapshot.push_row(vec![text("C"), num(2023.0), num(30.0)]);

        let out = reconcile(snapshot, Table::new(["Country", "date"]));

        assert_eq!(out.static_table.value(1, "Gini_Coefficient"), Some(&num(20.0)));
        let idx = out.static_table.column_index("Gini_Coefficient").unwrap();
        assert_eq!(out.static_table.column_mean(idx), Some(20.0));
    }

    #[test]
    fn colliding_columns_get_a_suffix_and_time_series_is_unpruned() {
        let mut snapshot = Table::new(["Country", "Year", "Exports"]);
        snapshot.push_row(vec![text("A"), num(2023.0), num(1.0)]);
        let mut ts = Table::new(["Country", "date", "Exports", "Currency"]);
        ts.push_row(vec![text("a"), num(2023.0), num(2.0), text("AAA")]);

        let out = reconcile(snapshot, ts);

        assert_eq!(out.static_table.value(0, "Exports_ts"), Some(&num(2.0)));
        assert_eq!(out.timeseries.columns(), ["Country", "Year", "Exports", "Currency"]);
        assert_eq!(out.timeseries.value(0, "Country"), Some(&text("A")));
    }

    #[test]
    fn reconciling_twice_is_identical() {
        let build = || {
            let mut snapshot = Table::new(["Country", "Year", "Population"]);
            snapshot.push_row(vec![text("A"), num(2023.0), Value::Null]);
            snapshot.push_row(vec![text("B"), num(2023.0), num(3.0)]);
            let mut ts = Table::new(["Country", "date", "GDP_Current_USD"]);
            ts.push_row(vec![text("B"), num(2023.0), num(9.0)]);
            (snapshot, ts)
        };
        let (s1, t1) = build();
        let (s2, t2) = build();
        assert_eq!(reconcile(s1, t1), reconcile(s2, t2));
    }
}
