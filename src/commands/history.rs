use anyhow::Result;
use console::style;

use super::{OutputFormat, connect, print_json};
use crate::config::Config;

pub async fn cmd_history(config: &Config, format: OutputFormat) -> Result<bool> {
    let merger = connect(config).await?;
    let records = merger.merge_history().await?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Human => {
            if records.is_empty() {
                println!("No merges recorded");
            }
            for record in &records {
                println!(
                    "{} {} {} ← {} ({}, {} tables, {} rows)",
                    style(format!("#{}", record.id)).dim(),
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    style(&record.target_schema).bold(),
                    record.source_schemas.join(", "),
                    record.strategy,
                    record.table_count,
                    record.rows_copied
                );
            }
        }
    }
    Ok(true)
}

/// Drop a schema and its merge history. Without `yes` nothing happens.
pub async fn cmd_drop(config: &Config, schema: &str, yes: bool) -> Result<bool> {
    if !yes {
        eprintln!(
            "❌ Refusing to drop schema {} without --yes",
            style(schema).bold()
        );
        return Ok(false);
    }

    let merger = connect(config).await?;
    let removed = merger.drop_schema(schema).await?;
    println!(
        "🗑️  Dropped schema {} ({} history records removed)",
        style(schema).bold(),
        removed
    );
    Ok(true)
}
