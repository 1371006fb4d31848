//! HTML extractor for per-entity "Economy of …" infobox pages.
//!
//! Each page has one fact table (`table.infobox`) made of `<th>`/`<td>` rows.
//! Labels are classified by [`RULES`], an ordered list where the first match
//! wins, and the value is run through that rule's cleaner.

use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::data::clean::{clean_currency, clean_numeric, clean_percentage, clean_population, clean_text};
use crate::data::http::{FetchFailure, HttpTransport};
use crate::domain::{FieldValue, SnapshotField, SnapshotRecord};
use crate::error::AppError;

/// How a matched value is turned into a typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleaner {
    Numeric,
    Percentage,
    Population,
    Currency,
    Text,
}

impl Cleaner {
    pub fn apply(self, raw: &str) -> Option<FieldValue> {
        match self {
            Cleaner::Numeric => clean_numeric(raw).map(FieldValue::Number),
            Cleaner::Percentage => clean_percentage(raw).map(FieldValue::Number),
            Cleaner::Population => clean_population(raw).map(FieldValue::Number),
            Cleaner::Currency => clean_currency(raw).map(FieldValue::Text),
            Cleaner::Text => clean_text(raw).map(FieldValue::Text),
        }
    }
}

/// Predicate over a lower-cased label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    /// Every keyword is a substring of the label.
    All(&'static [&'static str]),
    /// At least one keyword is a substring of the label.
    Any(&'static [&'static str]),
}

impl LabelMatch {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelMatch::All(keys) => keys.iter().all(|k| label.contains(k)),
            LabelMatch::Any(keys) => keys.iter().any(|k| label.contains(k)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub matcher: LabelMatch,
    pub field: SnapshotField,
    pub cleaner: Cleaner,
}

const fn rule(matcher: LabelMatch, field: SnapshotField, cleaner: Cleaner) -> Rule {
    Rule {
        matcher,
        field,
        cleaner,
    }
}

/// Classification rules in priority order.
///
/// Order matters: "debt" + "gdp" must come after the plain GDP rules, and the
/// growth/per-capita rules after "gdp (ppp)".
pub const RULES: [Rule; 18] = [
    rule(LabelMatch::All(&["gdp", "nominal"]), SnapshotField::GdpNominal, Cleaner::Numeric),
    rule(LabelMatch::All(&["gdp (ppp)"]), SnapshotField::GdpPpp, Cleaner::Numeric),
    rule(LabelMatch::All(&["gdp growth"]), SnapshotField::GdpGrowth, Cleaner::Percentage),
    rule(LabelMatch::All(&["gdp per capita"]), SnapshotField::GdpPerCapita, Cleaner::Numeric),
    rule(LabelMatch::All(&["inflation"]), SnapshotField::InflationRate, Cleaner::Percentage),
    rule(LabelMatch::All(&["unemployment"]), SnapshotField::UnemploymentRate, Cleaner::Percentage),
    rule(LabelMatch::All(&["population"]), SnapshotField::Population, Cleaner::Population),
    rule(LabelMatch::All(&["gini"]), SnapshotField::GiniCoefficient, Cleaner::Percentage),
    rule(LabelMatch::All(&["hdi"]), SnapshotField::Hdi, Cleaner::Numeric),
    rule(LabelMatch::All(&["debt", "gdp"]), SnapshotField::DebtToGdp, Cleaner::Percentage),
    rule(LabelMatch::All(&["trade balance"]), SnapshotField::TradeBalance, Cleaner::Numeric),
    rule(LabelMatch::All(&["currency"]), SnapshotField::Currency, Cleaner::Currency),
    rule(LabelMatch::All(&["reserves"]), SnapshotField::ForeignReserves, Cleaner::Numeric),
    rule(LabelMatch::All(&["labor force"]), SnapshotField::LaborForce, Cleaner::Numeric),
    rule(LabelMatch::All(&["exports", "goods"]), SnapshotField::Exports, Cleaner::Numeric),
    rule(LabelMatch::All(&["imports", "goods"]), SnapshotField::Imports, Cleaner::Numeric),
    rule(LabelMatch::All(&["poverty"]), SnapshotField::PovertyRate, Cleaner::Percentage),
    rule(LabelMatch::Any(&["main industries", "sectors"]), SnapshotField::MainSectors, Cleaner::Text),
];

/// First rule whose predicate matches the label (case-insensitive).
pub fn classify(label: &str) -> Option<&'static Rule> {
    let label = label.trim().to_lowercase();
    RULES.iter().find(|r| r.matcher.matches(&label))
}

/// Result of scraping one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Record(SnapshotRecord),
    /// The page loaded but has no fact table.
    NoInfobox,
    Failed(FetchFailure),
}

struct InfoboxSelectors {
    table: Selector,
    row: Selector,
    header: Selector,
    value: Selector,
}

impl InfoboxSelectors {
    fn new() -> Result<Self, FetchFailure> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| FetchFailure::Malformed(format!("selector `{css}`: {e}")))
        };
        Ok(Self {
            table: parse("table.infobox")?,
            row: parse("tr")?,
            header: parse("th")?,
            value: parse("td")?,
        })
    }
}

/// Parse an infobox page into a record.
///
/// Returns `Ok(None)` when the page has no fact table. `entity` is the page
/// identifier; the record's `Country` replaces underscores with spaces.
pub fn extract_record(html: &str, entity: &str, year: i32) -> Result<Option<SnapshotRecord>, FetchFailure> {
    let selectors = InfoboxSelectors::new()?;
    let document = Html::parse_document(html);

    let Some(infobox) = document.select(&selectors.table).next() else {
        return Ok(None);
    };

    let mut record = SnapshotRecord::new(entity.replace('_', " "), year);
    for row in infobox.select(&selectors.row) {
        let (Some(th), Some(td)) = (
            row.select(&selectors.header).next(),
            row.select(&selectors.value).next(),
        ) else {
            continue;
        };

        let label = element_text(th);
        let Some(rule) = classify(&label) else {
            continue;
        };
        if let Some(value) = rule.cleaner.apply(&element_text(td)) {
            record.set(rule.field, value);
        }
    }

    Ok(Some(record))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Scrapes infobox pages through an [`HttpTransport`]. No retries at this layer.
pub struct InfoboxScraper<T> {
    transport: T,
    base_url: String,
    reference_year: i32,
}

impl<T: HttpTransport> InfoboxScraper<T> {
    pub fn new(transport: T, base_url: impl Into<String>, reference_year: i32) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            reference_year,
        }
    }

    pub fn page_url(&self, entity: &str) -> String {
        format!("{}/Economy_of_{entity}", self.base_url.trim_end_matches('/'))
    }

    pub fn scrape_entity(&self, entity: &str) -> ScrapeOutcome {
        let resp = match self.transport.get(&self.page_url(entity), &[]) {
            Ok(resp) => resp,
            Err(e) => return ScrapeOutcome::Failed(e.into()),
        };
        if !resp.is_success() {
            return ScrapeOutcome::Failed(FetchFailure::Http { status: resp.status });
        }

        match extract_record(&resp.body, entity, self.reference_year) {
            Ok(Some(record)) => ScrapeOutcome::Record(record),
            Ok(None) => ScrapeOutcome::NoInfobox,
            Err(e) => ScrapeOutcome::Failed(e),
        }
    }

    /// Scrape every entity, dropping (and logging) the ones that fail.
    ///
    /// With `jobs > 1` pages are fetched on a rayon pool; records come back in
    /// input order either way.
    pub fn scrape_all(&self, entities: &[String], jobs: usize) -> Result<Vec<SnapshotRecord>, AppError> {
        let outcomes: Vec<ScrapeOutcome> = if jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| AppError::io("Failed to build worker pool", e))?;
            pool.install(|| entities.par_iter().map(|e| self.scrape_entity(e)).collect())
        } else {
            entities.iter().map(|e| self.scrape_entity(e)).collect()
        };

        let mut records = Vec::with_capacity(outcomes.len());
        for (entity, outcome) in entities.iter().zip(outcomes) {
            match outcome {
                ScrapeOutcome::Record(r) => {
                    debug!(entity = %entity, "scraped infobox");
                    records.push(r);
                }
                ScrapeOutcome::NoInfobox => {
                    warn!(entity = %entity, "no infobox found; entity dropped");
                }
                ScrapeOutcome::Failed(f) => {
                    warn!(entity = %entity, kind = f.kind(), error = %f, "scrape failed; entity dropped");
                }
            }
        }

        info!(requested = entities.len(), scraped = records.len(), "scrape finished");
        Ok(records)
    }
}
