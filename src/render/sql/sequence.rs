//! Target-owned sequences for SERIAL-style columns, and re-seeding after load

use crate::catalog::{ColumnDescriptor, TableDescriptor};
use crate::render::{escape_string, qualified_name, quote_ident};

/// Name of the sequence the target creates for `table.column`
pub fn owned_sequence_name(table: &str, column: &str) -> String {
    format!("{}_{}_seq", table, column)
}

/// Columns whose default draws from a sequence and that need one of their own in the target
pub fn sequence_backed_columns(table: &TableDescriptor) -> impl Iterator<Item = &ColumnDescriptor> {
    table
        .columns
        .iter()
        .filter(|c| c.identity.is_none() && c.uses_sequence_default())
}

/// `nextval(...)` default pointing at the target's own sequence
pub fn render_sequence_default(target: &str, table: &str, column: &str) -> String {
    format!(
        "nextval({}::regclass)",
        escape_string(&qualified_name(target, &owned_sequence_name(table, column)))
    )
}

pub fn render_create_sequence(target: &str, table: &str, column: &str) -> String {
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {};",
        qualified_name(target, &owned_sequence_name(table, column))
    )
}

/// Tie the sequence's lifetime to the column, so dropping the table drops it too
pub fn render_sequence_owned_by(target: &str, table: &str, column: &str) -> String {
    format!(
        "ALTER SEQUENCE {} OWNED BY {}.{};",
        qualified_name(target, &owned_sequence_name(table, column)),
        qualified_name(target, table),
        quote_ident(column)
    )
}

/// Advance the column's sequence past the largest loaded value.
/// Returns no row (and leaves the sequence alone) when the table is empty.
pub fn render_reseed(target: &str, table: &str, column: &str) -> String {
    let qualified = qualified_name(target, table);
    format!(
        "SELECT setval(pg_get_serial_sequence({}, {}), MAX({col})) FROM {} HAVING MAX({col}) IS NOT NULL",
        escape_string(&qualified),
        escape_string(column),
        qualified,
        col = quote_ident(column)
    )
}
