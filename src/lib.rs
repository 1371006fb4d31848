//! `econ-pipeline` library crate.
//!
//! The binary (`econ`) is a thin wrapper around this library so that:
//!
//! - every stage (scrape, fetch, reconcile) is testable without spawning processes
//! - HTTP is reached through a trait, so tests run against scripted responses
//! - the canonical CSV tables can be produced from other front-ends later

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod report;
