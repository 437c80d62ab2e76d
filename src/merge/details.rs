//! Result types reported by merge entry points
use serde::Serialize;
use std::collections::BTreeMap;

use super::strategy::MergeStrategy;
use crate::error::{ErrorKind, MergeError};

/// A table (or one source's copy of it) left out of the merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub table: String,
    /// Source whose rows were skipped; `None` when the whole table was left out
    pub source: Option<String>,
    pub reason: String,
}

/// Summary of a completed merge job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeDetails {
    pub sources: Vec<String>,
    pub target: String,
    pub strategy: MergeStrategy,
    /// Creation and load order
    pub order: Vec<String>,
    pub tables_created: Vec<String>,
    pub rows_copied: BTreeMap<String, u64>,
    /// Sources that contributed rows, per table
    pub provenance: BTreeMap<String, Vec<String>>,
    /// Batch statements issued per table (batched merges only)
    pub batches: BTreeMap<String, usize>,
    /// Tables held by exactly one source, with that source
    pub only_in_one_source: BTreeMap<String, String>,
    /// Tables held by more than one source
    pub shared_tables: Vec<String>,
    /// `table.constraint` for every foreign key added after load
    pub foreign_keys_activated: Vec<String>,
    /// `table.column` for every sequence advanced past loaded values
    pub sequences_reseeded: Vec<String>,
    pub indexes_rebuilt: Vec<String>,
    pub skipped: Vec<SkippedTable>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

impl MergeDetails {
    pub fn total_rows(&self) -> u64 {
        self.rows_copied.values().sum()
    }

    pub fn skip(&mut self, table: &str, source: Option<&str>, reason: impl Into<String>) {
        self.skipped.push(SkippedTable {
            table: table.to_string(),
            source: source.map(|s| s.to_string()),
            reason: reason.into(),
        });
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn summary(&self) -> String {
        format!(
            "Merged {} schema{} into \"{}\": {} table{}, {} row{}",
            self.sources.len(),
            plural(self.sources.len()),
            self.target,
            self.tables_created.len(),
            plural(self.tables_created.len()),
            self.total_rows(),
            plural(self.total_rows() as usize)
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `(ok, message, details)` as returned by every merge entry point.
/// `details` is present exactly when `ok` is true.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub details: Option<MergeDetails>,
}

impl MergeOutcome {
    pub fn success(details: MergeDetails) -> Self {
        Self {
            ok: true,
            message: details.summary(),
            error_kind: None,
            details: Some(details),
        }
    }

    pub fn failure(error: &MergeError) -> Self {
        Self {
            ok: false,
            message: error.labelled(),
            error_kind: Some(error.kind()),
            details: None,
        }
    }
}

impl From<Result<MergeDetails, MergeError>> for MergeOutcome {
    fn from(result: Result<MergeDetails, MergeError>) -> Self {
        match result {
            Ok(details) => MergeOutcome::success(details),
            Err(error) => MergeOutcome::failure(&error),
        }
    }
}

/// Table-set comparison of two schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaComparison {
    /// Both schemas hold exactly the same table names
    pub equal: bool,
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub common: Vec<String>,
}

impl SchemaComparison {
    /// Compare two name-sorted table lists
    pub fn from_tables(a: &[String], b: &[String]) -> Self {
        let only_in_a: Vec<String> = a.iter().filter(|t| !b.contains(t)).cloned().collect();
        let only_in_b: Vec<String> = b.iter().filter(|t| !a.contains(t)).cloned().collect();
        let common: Vec<String> = a.iter().filter(|t| b.contains(t)).cloned().collect();
        Self {
            equal: only_in_a.is_empty() && only_in_b.is_empty(),
            only_in_a,
            only_in_b,
            common,
        }
    }
}
