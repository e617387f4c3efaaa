// src/analysis/mod.rs
//! Report comparison
//!
//! Row-level diffing of same-keyed tables and aggregation of those diffs
//! into a summary, headline ranking and trend selection.

pub mod aggregator;
pub mod differ;

pub use aggregator::ChangeAggregator;
pub use differ::{parse_number, percent_change, TableDiffer};
