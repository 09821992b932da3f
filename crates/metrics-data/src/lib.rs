//! Data ingestion layer for creator metrics.
//!
//! Reads JSONL event and episode exports and featured-content CSV files, and
//! runs the core calculators over whole batches for reporting.

pub mod aggregator;
pub mod analysis;
pub mod csv;
pub mod reader;

pub use metrics_core as core;
