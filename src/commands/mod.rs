pub mod history;
pub mod inspect;
pub mod merge;

// Re-export all command functions
pub use history::{cmd_drop, cmd_history};
pub use inspect::{cmd_compare, cmd_schemas, cmd_tables};
pub use merge::cmd_merge;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::{Config, TableFilter};
use crate::merge::{MergeOptions, SchemaMerger};

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Styled text for terminals
    #[default]
    Human,
    /// JSON document on stdout
    Json,
}

/// Merge options derived from resolved configuration
pub fn merge_options(config: &Config) -> MergeOptions {
    MergeOptions {
        filter: TableFilter::new(&config.tables, Some(&config.audit.table)),
        audit_table: config.audit.table.clone(),
        record_audit: config.audit.enabled,
        lock_target: config.merge.lock_target,
        timeout: config.merge.timeout,
    }
}

/// Connect to the configured database
pub async fn connect(config: &Config) -> Result<SchemaMerger> {
    let url = config.database.require_url()?;
    let merger = SchemaMerger::connect(url, &config.database.connection)
        .await
        .context("Failed to open database connection")?;
    Ok(merger.with_options(merge_options(config)))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
