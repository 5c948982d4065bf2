//! `cdrecon-engine` - two-sided CDR reconciliation engine.
//!
//! Pure engine crate: receives two file paths with column mappings, returns
//! a summary plus a bounded, cost-ranked sample of discrepancies. No CLI or
//! HTTP dependencies.

pub mod billing;
pub mod classify;
pub mod collector;
pub mod error;
pub mod hung;
pub mod job;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod scratch;
pub mod staging;
pub mod summary;

pub use error::EngineError;
pub use job::reconcile;
pub use model::{
    ColumnMapping, Discrepancy, DiscrepancyType, JobInput, JobOutput, Side, Summary,
};
