use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MergeError;

/// How rows from several sources are reconciled in one target table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Every source contributes; on a primary-key collision the later source wins
    #[default]
    Union,
    /// Only the first source holding the table contributes
    Priority,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Union => "union",
            MergeStrategy::Priority => "priority",
        }
    }

    /// Narrow the sources holding a table (in caller order) to those that contribute rows
    pub fn contributors<'a, T>(&self, holders: &'a [T]) -> &'a [T] {
        match self {
            MergeStrategy::Union => holders,
            MergeStrategy::Priority => &holders[..holders.len().min(1)],
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(MergeStrategy::Union),
            "priority" => Ok(MergeStrategy::Priority),
            other => Err(MergeError::invalid(format!(
                "unknown merge strategy '{}' (expected 'union' or 'priority')",
                other
            ))),
        }
    }
}
