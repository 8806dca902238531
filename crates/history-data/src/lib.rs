//! Ingestion and analytics layer for listening-history exports.
//!
//! Responsible for discovering export files, normalizing their schema
//! variants into canonical records, building the cleaned relation,
//! aggregating it and persisting every artifact as CSV.

pub mod aggregator;
pub mod analysis;
pub mod normalizer;
pub mod reader;
pub mod relation;
pub mod writer;

pub use history_core as core;
