use anyhow::Result;
use console::style;
use itertools::Itertools;

use super::{OutputFormat, merge_options, print_json};
use crate::config::Config;
use crate::merge::{MergeDetails, MergeOutcome, MergeRequest, SchemaMerger};

/// Run `pgmerge merge`. Returns whether the merge succeeded.
///
/// The request is validated before any connection is opened, so argument mistakes are
/// reported without touching the database.
pub async fn cmd_merge(
    config: &Config,
    sources: &[String],
    target: &str,
    format: OutputFormat,
) -> Result<bool> {
    let request = MergeRequest::new(sources, target)
        .with_strategy(config.merge.strategy)
        .with_batch_size(config.merge.batch_size)
        .with_create_target(config.merge.create_target);

    if let Err(e) = request.clone().normalize() {
        return report(&MergeOutcome::failure(&e), format);
    }

    let url = config.database.require_url()?;
    let merger = match SchemaMerger::connect(url, &config.database.connection).await {
        Ok(merger) => merger.with_options(merge_options(config)),
        Err(e) => return report(&MergeOutcome::failure(&e), format),
    };

    if format == OutputFormat::Human {
        println!(
            "🔀 Merging {} into {} ({})",
            sources.iter().map(|s| style(s).cyan()).join(", "),
            style(target).cyan().bold(),
            config.merge.strategy
        );
    }

    let outcome = merger.merge(request).await;
    report(&outcome, format)
}

fn report(outcome: &MergeOutcome, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => print_json(outcome)?,
        OutputFormat::Human => match &outcome.details {
            Some(details) if outcome.ok => print_details(&outcome.message, details),
            _ => eprintln!("❌ {}", style(&outcome.message).red()),
        },
    }
    Ok(outcome.ok)
}

fn print_details(message: &str, details: &MergeDetails) {
    println!("✅ {}", style(message).green());
    println!("   {} {}", style("order:").dim(), details.order.join(" → "));

    for table in &details.tables_created {
        let rows = details.rows_copied.get(table).copied().unwrap_or(0);
        let sources = details
            .provenance
            .get(table)
            .map(|s| s.join(", "))
            .unwrap_or_default();
        let batches = details
            .batches
            .get(table)
            .map(|n| format!(" in {} batches", n))
            .unwrap_or_default();
        println!(
            "   {:<30} {:>10} rows{}  {}",
            table,
            rows,
            batches,
            style(format!("from {}", sources)).dim()
        );
    }

    if !details.foreign_keys_activated.is_empty() {
        println!(
            "   {} foreign keys activated",
            details.foreign_keys_activated.len()
        );
    }
    if !details.indexes_rebuilt.is_empty() {
        println!("   {} indexes rebuilt", details.indexes_rebuilt.len());
    }
    if !details.sequences_reseeded.is_empty() {
        println!("   {} sequences re-seeded", details.sequences_reseeded.len());
    }

    for skipped in &details.skipped {
        let from = skipped
            .source
            .as_deref()
            .map(|s| format!(" (from {})", s))
            .unwrap_or_default();
        println!(
            "   {} {}{}: {}",
            style("skipped").yellow(),
            skipped.table,
            from,
            skipped.reason
        );
    }
    for warning in &details.warnings {
        println!("   ⚠️  {}", style(warning).yellow());
    }

    println!(
        "   {}",
        style(format!("finished in {} ms", details.elapsed_ms)).dim()
    );
}
