//! Remote data acquisition: infobox scraping and the indicator API.

pub mod clean;
pub mod http;
pub mod infobox;
pub mod worldbank;

pub use http::{FetchFailure, HttpResponse, HttpTransport, ReqwestTransport, RetryPolicy, TransportError};
pub use infobox::{InfoboxScraper, ScrapeOutcome};
pub use worldbank::{CellOutcome, WorldBankFetcher};
