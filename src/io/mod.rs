//! Input/output helpers.
//!
//! - CSV ingest into a typed [`Table`](crate::domain::Table) (`ingest`)
//! - CSV writers for snapshot records and tables (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
