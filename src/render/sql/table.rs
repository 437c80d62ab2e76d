//! CREATE TABLE rendering for the target schema
//!
//! Tables are created without foreign keys. Those are added once every table is loaded,
//! so load order only has to respect dependencies, never complete them.

use crate::catalog::TableDescriptor;
use crate::render::sql::sequence::render_sequence_default;
use crate::render::{column_list, qualified_name, quote_ident};

pub fn render_create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(schema))
}

pub fn render_drop_table(target: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", qualified_name(target, table))
}

/// Render `table` as a CREATE TABLE statement in schema `target`.
///
/// Handles:
/// - Column definitions with data types and NOT NULL
/// - DEFAULT values, with sequence defaults re-pointed at the target's own sequences
/// - Identity columns, always as GENERATED BY DEFAULT so loaded values are accepted
/// - Stored generated columns (GENERATED ALWAYS AS ... STORED)
/// - Primary key, unique and check constraints
pub fn render_create_table(target: &str, table: &TableDescriptor) -> String {
    let mut sql = String::new();

    sql.push_str("CREATE TABLE ");
    sql.push_str(&qualified_name(target, &table.name));
    sql.push_str(" (\n");

    let mut definitions = Vec::new();

    for column in &table.columns {
        let mut col_def = format!("    {} {}", quote_ident(&column.name), column.data_type);

        if column.identity.is_some() {
            col_def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        } else if let Some(ref generated_expr) = column.generated {
            col_def.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", generated_expr));
        } else if column.uses_sequence_default() {
            col_def.push_str(&format!(
                " DEFAULT {}",
                render_sequence_default(target, &table.name, &column.name)
            ));
        } else if let Some(ref default) = column.default {
            col_def.push_str(&format!(" DEFAULT {}", default));
        }

        if column.not_null {
            col_def.push_str(" NOT NULL");
        }

        definitions.push(col_def);
    }

    if let Some(ref pk) = table.primary_key {
        definitions.push(format!(
            "    CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&pk.name),
            column_list(&pk.columns)
        ));
    }

    for unique in &table.unique_constraints {
        definitions.push(format!(
            "    CONSTRAINT {} UNIQUE ({})",
            quote_ident(&unique.name),
            column_list(&unique.columns)
        ));
    }

    for check in &table.check_constraints {
        definitions.push(format!(
            "    CONSTRAINT {} CHECK ({})",
            quote_ident(&check.name),
            check.expression
        ));
    }

    sql.push_str(&definitions.join(",\n"));
    sql.push_str("\n);");

    sql
}
