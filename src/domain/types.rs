//! Run configuration shared by every stage.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::entity::{CountryCodes, DEFAULT_ENTITIES};
use crate::error::AppError;

pub const RAW_SNAPSHOT_FILE: &str = "raw_economic_data.csv";
pub const RAW_TIMESERIES_FILE: &str = "worldbank_data.csv";
pub const CANONICAL_STATIC_FILE: &str = "processed_economic_data.csv";
pub const CANONICAL_TIMESERIES_FILE: &str = "processed_worldbank_data.csv";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_WIKI_BASE_URL: &str = "https://en.wikipedia.org/wiki";
pub const DEFAULT_API_BASE_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_REFERENCE_YEAR: i32 = 2023;
pub const DEFAULT_START_YEAR: i32 = 2015;
pub const DEFAULT_END_YEAR: i32 = 2023;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Indicator code → output column, in output order.
pub const DEFAULT_INDICATORS: [(&str, &str); 9] = [
    ("NY.GDP.MKTP.CD", "GDP_Current_USD"),
    ("NY.GDP.PCAP.CD", "GDP_Per_Capita_USD"),
    ("FP.CPI.TOTL.ZG", "Inflation_Rate_WB"),
    ("SL.UEM.TOTL.ZS", "Unemployment_Rate_WB"),
    ("NY.GDP.PCAP.KD.ZG", "GDP_Per_Capita_Growth"),
    ("NE.EXP.GNFS.CD", "Exports_WB"),
    ("NE.IMP.GNFS.CD", "Imports_WB"),
    ("SI.POV.GINI", "Gini_Coefficient_WB"),
    ("SP.POP.TOTL", "Population_WB"),
];

/// A remote indicator and the column it lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub code: String,
    pub column: String,
}

impl Indicator {
    pub fn new(code: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            column: column.into(),
        }
    }

    pub fn defaults() -> Vec<Indicator> {
        DEFAULT_INDICATORS
            .iter()
            .map(|(code, column)| Indicator::new(*code, *column))
            .collect()
    }
}

/// Inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::config(format!(
                "Invalid year range: start {start} is after end {end}."
            )));
        }
        Ok(Self { start, end })
    }

    pub fn years(self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// Retry settings for the time-series API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_factor: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
        }
    }
}

/// Fully resolved configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    /// Page identifiers for the extractor (underscored form).
    pub entities: Vec<String>,
    pub reference_year: i32,
    pub years: YearRange,
    pub indicators: Vec<Indicator>,
    pub country_codes: CountryCodes,
    pub wiki_base_url: String,
    pub api_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retry: RetrySettings,
    /// Worker threads for the scrape and fetch loops; `1` runs sequentially.
    pub jobs: usize,
    pub probe: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            entities: DEFAULT_ENTITIES.iter().map(|s| s.to_string()).collect(),
            reference_year: DEFAULT_REFERENCE_YEAR,
            years: YearRange {
                start: DEFAULT_START_YEAR,
                end: DEFAULT_END_YEAR,
            },
            indicators: Indicator::defaults(),
            country_codes: CountryCodes::default(),
            wiki_base_url: DEFAULT_WIKI_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetrySettings::default(),
            jobs: 1,
            probe: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jobs == 0 {
            return Err(AppError::config("`--jobs` must be >= 1."));
        }
        if self.timeout.is_zero() {
            return Err(AppError::config("`--timeout-secs` must be > 0."));
        }
        if self.years.start > self.years.end {
            return Err(AppError::config(format!(
                "Invalid year range: start {} is after end {}.",
                self.years.start, self.years.end
            )));
        }
        if self.indicators.is_empty() {
            return Err(AppError::config("At least one indicator is required."));
        }
        Ok(())
    }

    pub fn raw_snapshot_path(&self) -> PathBuf {
        self.data_dir.join(RAW_SNAPSHOT_FILE)
    }

    pub fn raw_timeseries_path(&self) -> PathBuf {
        self.data_dir.join(RAW_TIMESERIES_FILE)
    }

    pub fn canonical_static_path(&self) -> PathBuf {
        self.data_dir.join(CANONICAL_STATIC_FILE)
    }

    pub fn canonical_timeseries_path(&self) -> PathBuf {
        self.data_dir.join(CANONICAL_TIMESERIES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_is_inclusive() {
        let r = YearRange::new(2015, 2023).unwrap();
        assert_eq!(r.years().count(), 9);
        assert_eq!(r.years().last(), Some(2023));
        assert!(YearRange::new(2024, 2023).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let c = PipelineConfig::default();
        c.validate().unwrap();
        assert_eq!(c.entities.len(), 50);
        assert_eq!(c.raw_snapshot_path(), PathBuf::from("data/raw_economic_data.csv"));
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let c = PipelineConfig {
            jobs: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(c.validate().unwrap_err().exit_code(), 2);
    }
}
