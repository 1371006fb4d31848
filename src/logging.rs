//! `tracing` subscriber setup.
//!
//! Diagnostics go to stderr so stdout stays reserved for stage summaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::AppError;

pub const DEFAULT_FILTER: &str = "econ_pipeline=info,warn";
pub const VERBOSE_FILTER: &str = "econ_pipeline=debug,warn";

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool, json: bool) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(verbose))
            .map_err(|e| AppError::config(format!("Invalid log filter: {e}")))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    installed.map_err(|e| AppError::new(4, format!("Failed to install log subscriber: {e}")))
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives(false)).is_ok());
        assert!(EnvFilter::try_new(default_directives(true)).is_ok());
    }
}
