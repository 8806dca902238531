//! Shared building blocks for the listening-history pipeline.
//!
//! Holds the canonical record types, the error type, settings and the
//! value-coercion helpers used while normalizing raw export files.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
