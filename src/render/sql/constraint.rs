//! ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY rendering

use crate::catalog::ForeignKeyDescriptor;
use crate::render::{column_list, qualified_name, quote_ident};

/// Render `fk` as a constraint on `target`.`table`, referencing `referenced_schema`.
///
/// The caller picks `referenced_schema`: the target itself for references between merged
/// tables, the original schema for references that leave the source.
pub fn render_add_foreign_key(
    target: &str,
    table: &str,
    fk: &ForeignKeyDescriptor,
    referenced_schema: &str,
) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
        qualified_name(target, table),
        quote_ident(&fk.name),
        column_list(&fk.columns),
        qualified_name(referenced_schema, &fk.referenced_table),
        column_list(&fk.referenced_columns),
        fk.on_update.as_sql(),
        fk.on_delete.as_sql()
    );

    if fk.deferrable {
        sql.push_str(" DEFERRABLE");
        if fk.initially_deferred {
            sql.push_str(" INITIALLY DEFERRED");
        }
    }

    sql.push(';');
    sql
}
