//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - entities and their external codes (`CountryCodes`)
//! - the raw snapshot record produced by the extractor (`SnapshotRecord`)
//! - the dynamic table the fetcher and reconciler exchange (`Table`, `Value`)
//! - run configuration (`PipelineConfig`, `YearRange`, `Indicator`)

pub mod entity;
pub mod record;
pub mod table;
pub mod types;

pub use entity::*;
pub use record::*;
pub use table::*;
pub use types::*;
