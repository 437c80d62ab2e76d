//! Read-only commands: `tables`, `compare`, `schemas`
use anyhow::Result;
use console::style;
use serde_json::json;

use super::{OutputFormat, connect, print_json};
use crate::config::Config;

pub async fn cmd_tables(config: &Config, schema: &str, format: OutputFormat) -> Result<bool> {
    let merger = connect(config).await?;
    let tables = merger.list_schema_tables(schema).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "schema": schema, "tables": tables }))?,
        OutputFormat::Human => {
            println!(
                "📋 {} ({} tables)",
                style(schema).bold(),
                tables.len()
            );
            for table in &tables {
                println!("   {}", table);
            }
        }
    }
    Ok(true)
}

/// Compare the table sets of two schemas. Succeeds whether or not they match.
pub async fn cmd_compare(config: &Config, a: &str, b: &str, format: OutputFormat) -> Result<bool> {
    let merger = connect(config).await?;
    let comparison = merger.compare_schemas(a, b).await?;

    match format {
        OutputFormat::Json => print_json(&comparison)?,
        OutputFormat::Human => {
            if comparison.equal {
                println!(
                    "✅ {} and {} hold the same {} tables",
                    style(a).bold(),
                    style(b).bold(),
                    comparison.common.len()
                );
            } else {
                println!(
                    "🔍 {} vs {}: {} in common",
                    style(a).bold(),
                    style(b).bold(),
                    comparison.common.len()
                );
                for table in &comparison.only_in_a {
                    println!("   {} {} (only in {})", style("-").red(), table, a);
                }
                for table in &comparison.only_in_b {
                    println!("   {} {} (only in {})", style("+").green(), table, b);
                }
            }
        }
    }
    Ok(true)
}

pub async fn cmd_schemas(config: &Config, format: OutputFormat) -> Result<bool> {
    let merger = connect(config).await?;
    let schemas = merger.list_schemas().await?;

    match format {
        OutputFormat::Json => print_json(&schemas)?,
        OutputFormat::Human => {
            println!("{:<30} {:>8} {:>14}", style("schema").bold(), "tables", "size");
            for info in &schemas {
                println!(
                    "{:<30} {:>8} {:>14}",
                    info.name,
                    info.table_count,
                    format_bytes(info.total_size_bytes)
                );
            }
        }
    }
    Ok(true)
}

fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
