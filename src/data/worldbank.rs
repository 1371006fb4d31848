//! World Bank indicator API integration.
//!
//! One request per (entity, year, indicator). Responses are the API's usual
//! two-element array: `[ {paging}, [ {"value": …}, … ] ]`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::http::{FetchFailure, HttpTransport, RetryPolicy, RetrySession};
use crate::domain::{CountryCodes, Indicator, Table, Value, YearRange, title_case};
use crate::error::AppError;

const PER_PAGE: usize = 1000;

/// Probe request issued before the main loop.
const PROBE_CODE: &str = "USA";
const PROBE_INDICATOR: &str = "NY.GDP.MKTP.CD";
const PROBE_YEAR: i32 = 2020;

/// Outcome of one (entity, year, indicator) cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// Non-null observations, in response order.
    Observed(Vec<f64>),
    /// Observations were returned but every value was null.
    NullValue,
    /// The response had no observation list (or an empty one).
    EmptyResponse,
    Failed(FetchFailure),
}

#[derive(Debug, Deserialize)]
struct Observation {
    #[serde(default)]
    value: Option<ObservationValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ObservationValue {
    Number(f64),
    Text(String),
}

impl ObservationValue {
    fn as_f64(&self) -> Option<f64> {
        let v = match self {
            ObservationValue::Number(v) => *v,
            ObservationValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if v.is_finite() { Some(v) } else { None }
    }
}

/// Interpret a response body.
pub fn parse_observations(body: &str) -> CellOutcome {
    let page: Vec<serde_json::Value> = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => return CellOutcome::Failed(FetchFailure::Malformed(e.to_string())),
    };

    let Some(list) = page.get(1).filter(|v| v.as_array().is_some_and(|a| !a.is_empty())) else {
        return CellOutcome::EmptyResponse;
    };

    let observations: Vec<Observation> = match serde_json::from_value(list.clone()) {
        Ok(o) => o,
        Err(e) => return CellOutcome::Failed(FetchFailure::Malformed(e.to_string())),
    };

    let values: Vec<f64> = observations
        .iter()
        .filter_map(|o| o.value.as_ref().and_then(ObservationValue::as_f64))
        .collect();

    if values.is_empty() {
        CellOutcome::NullValue
    } else {
        CellOutcome::Observed(values)
    }
}

/// One unit of fetch work.
#[derive(Debug, Clone)]
struct Cell<'a> {
    country: String,
    code: &'a str,
    year: i32,
    indicator: usize,
}

pub struct WorldBankFetcher<T> {
    session: RetrySession<T>,
    base_url: String,
    codes: CountryCodes,
}

impl<T: HttpTransport> WorldBankFetcher<T> {
    pub fn new(transport: T, base_url: impl Into<String>, codes: CountryCodes, policy: RetryPolicy) -> Self {
        Self {
            session: RetrySession::new(transport, policy),
            base_url: base_url.into(),
            codes,
        }
    }

    pub fn indicator_url(&self, code: &str, indicator: &str) -> String {
        format!(
            "{}/country/{code}/indicator/{indicator}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Fetch a single cell (retries included).
    pub fn fetch_cell(&self, code: &str, year: i32, indicator: &str) -> CellOutcome {
        let query = [
            ("date", year.to_string()),
            ("format", "json".to_string()),
            ("per_page", PER_PAGE.to_string()),
        ];
        match self.session.get(&self.indicator_url(code, indicator), &query) {
            Ok(delivered) => parse_observations(&delivered.body),
            Err(f) => CellOutcome::Failed(f),
        }
    }

    /// Single request to check connectivity; the result is only logged.
    pub fn probe(&self) {
        match self.fetch_cell(PROBE_CODE, PROBE_YEAR, PROBE_INDICATOR) {
            CellOutcome::Failed(f) => {
                warn!(kind = f.kind(), error = %f, "connectivity probe failed");
            }
            outcome => debug!(?outcome, "connectivity probe response"),
        }
    }

    /// Fetch every (entity, year, indicator) and pivot to one row per
    /// (entity, year).
    ///
    /// Output columns: `Country`, `date`, then one per indicator. Entities
    /// without a known code are skipped with a warning. If nothing is
    /// collected the table is empty (header only).
    pub fn fetch(
        &self,
        entities: &[String],
        indicators: &[Indicator],
        years: YearRange,
        jobs: usize,
    ) -> Result<Table, AppError> {
        let mut cells = Vec::new();
        for entity in entities {
            let country = title_case(entity);
            let Some(code) = self.codes.get(&country) else {
                warn!(entity = %entity, "no country code; entity skipped");
                continue;
            };
            for year in years.years() {
                for indicator in 0..indicators.len() {
                    cells.push(Cell {
                        country: country.clone(),
                        code,
                        year,
                        indicator,
                    });
                }
            }
        }

        let run = |c: &Cell<'_>| self.fetch_cell(c.code, c.year, &indicators[c.indicator].code);
        let outcomes: Vec<CellOutcome> = if jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| AppError::io("Failed to build worker pool", e))?;
            pool.install(|| cells.par_iter().map(run).collect())
        } else {
            cells.iter().map(run).collect()
        };

        let mut collected = Vec::new();
        for (cell, outcome) in cells.iter().zip(outcomes) {
            let column = &indicators[cell.indicator].column;
            match outcome {
                CellOutcome::Observed(values) => {
                    debug!(entity = %cell.country, year = cell.year, indicator = %column, n = values.len(), "fetched");
                    for v in values {
                        collected.push((cell.country.clone(), cell.year, cell.indicator, v));
                    }
                }
                CellOutcome::NullValue => {
                    debug!(entity = %cell.country, year = cell.year, indicator = %column, "no data");
                }
                CellOutcome::EmptyResponse => {
                    debug!(entity = %cell.country, year = cell.year, indicator = %column, "empty response");
                }
                CellOutcome::Failed(f) => {
                    warn!(
                        entity = %cell.country,
                        year = cell.year,
                        indicator = %column,
                        kind = f.kind(),
                        error = %f,
                        "request failed; cell left empty"
                    );
                }
            }
        }

        let table = pivot(&collected, indicators);
        if table.is_empty() {
            warn!("no data collected; fall back to a cached dataset or check API connectivity");
        } else {
            info!(rows = table.len(), cells = cells.len(), "fetch finished");
        }
        Ok(table)
    }
}

/// Pivot `(country, year, indicator index, value)` tuples into one row per
/// (country, year), sorted by country then year. The first value seen for a
/// cell wins.
pub fn pivot(collected: &[(String, i32, usize, f64)], indicators: &[Indicator]) -> Table {
    let mut rows: BTreeMap<(&str, i32), Vec<Option<f64>>> = BTreeMap::new();
    for (country, year, indicator, value) in collected {
        let row = rows
            .entry((country.as_str(), *year))
            .or_insert_with(|| vec![None; indicators.len()]);
        if row[*indicator].is_none() {
            row[*indicator] = Some(*value);
        }
    }

    let mut columns = vec!["Country".to_string(), "date".to_string()];
    columns.extend(indicators.iter().map(|i| i.column.clone()));
    let mut table = Table::new(columns);

    for ((country, year), values) in rows {
        let mut row = Vec::with_capacity(values.len() + 2);
        row.push(Value::Text(country.to_string()));
        row.push(Value::Number(f64::from(year)));
        row.extend(values.into_iter().map(Value::from_f64));
        table.push_row(row);
    }
    table
}
