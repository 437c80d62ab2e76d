//! CREATE INDEX rendering for the target schema

use crate::catalog::IndexDescriptor;
use crate::render::{qualified_name, quote_ident};

/// Render a CREATE INDEX statement for `index` on `target`.`table`.
///
/// The head (name, uniqueness, table) is rebuilt so the index lands on the target table.
/// Key columns, opclasses, ordering, INCLUDE, storage parameters and the partial predicate
/// are taken from the catalog definition verbatim. Without a usable definition the
/// statement is assembled from the descriptor's parts.
pub fn render_create_index(target: &str, table: &str, index: &IndexDescriptor) -> String {
    let mut sql = String::from("CREATE ");
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str(&format!(
        "INDEX {} ON {} ",
        quote_ident(&index.name),
        qualified_name(target, table)
    ));

    match index.definition_tail() {
        Some(tail) => sql.push_str(tail),
        None => {
            sql.push_str(&format!(
                "USING {} ({})",
                index.method,
                index.key_expressions.join(", ")
            ));
            if !index.include_columns.is_empty() {
                sql.push_str(&format!(" INCLUDE ({})", index.include_columns.join(", ")));
            }
            if let Some(ref predicate) = index.predicate {
                sql.push_str(&format!(" WHERE ({})", predicate));
            }
        }
    }

    sql.push(';');
    sql
}
