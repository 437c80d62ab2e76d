//! Merge independently populated PostgreSQL schemas into one.
//!
//! Tables are read from the catalog, ordered by their foreign keys, created in the target
//! without foreign keys, loaded source by source, and then constrained and indexed, all
//! inside one transaction. [`SchemaMerger`] is the entry point.

pub mod audit;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod graph;
pub mod merge;
pub mod render;

pub use error::{ErrorKind, MergeError, MergeResult};
pub use merge::{
    MergeDetails, MergeOptions, MergeOutcome, MergeRequest, MergeStrategy, SchemaComparison,
    SchemaMerger,
};
