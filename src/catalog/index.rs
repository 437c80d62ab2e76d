//! Fetch secondary indexes via pg_catalog
//!
//! Primary-key indexes and indexes backing a unique or exclusion constraint are left out:
//! those come back with the constraint itself when the table is created.
use sqlx::postgres::PgConnection;
use tracing::info;

use crate::error::MergeResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: String,
    /// Full `pg_get_indexdef` text, naming the source table
    pub definition: String,
    /// Access method (btree, gin, ...)
    pub method: String,
    pub unique: bool,
    pub key_expressions: Vec<String>,
    pub include_columns: Vec<String>,
    /// WHERE clause of a partial index
    pub predicate: Option<String>,
}

impl IndexDescriptor {
    /// Everything from ` USING ` onward: method, keys with opclasses and ordering,
    /// INCLUDE, storage parameters, predicate
    pub fn definition_tail(&self) -> Option<&str> {
        self.definition
            .find(" USING ")
            .map(|pos| &self.definition[pos + 1..])
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IndexRow {
    table_name: String,
    index_name: String,
    definition: String,
    method: String,
    is_unique: bool,
    key_expressions: Vec<String>,
    include_columns: Vec<String>,
    predicate: Option<String>,
}

/// Fetch secondary indexes of `schema` (or one table), as `(table name, index)` pairs
pub async fn fetch(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<Vec<(String, IndexDescriptor)>> {
    info!("Fetching indexes of schema {}...", schema);

    let rows = sqlx::query_as::<_, IndexRow>(
        r#"
        SELECT
            t.relname::text AS table_name,
            i.relname::text AS index_name,
            pg_catalog.pg_get_indexdef(idx.indexrelid) AS definition,
            am.amname::text AS method,
            idx.indisunique AS is_unique,
            ARRAY(
                SELECT pg_catalog.pg_get_indexdef(idx.indexrelid, k, true)
                FROM generate_series(1, idx.indnkeyatts) AS k
                ORDER BY k
            ) AS key_expressions,
            ARRAY(
                SELECT pg_catalog.pg_get_indexdef(idx.indexrelid, k, true)
                FROM generate_series(idx.indnkeyatts + 1, idx.indnatts) AS k
                ORDER BY k
            ) AS include_columns,
            pg_catalog.pg_get_expr(idx.indpred, idx.indrelid, true) AS predicate
        FROM pg_index idx
        JOIN pg_class i ON idx.indexrelid = i.oid
        JOIN pg_class t ON idx.indrelid = t.oid
        JOIN pg_namespace n ON t.relnamespace = n.oid
        JOIN pg_am am ON i.relam = am.oid
        WHERE n.nspname = $1
          AND t.relkind = 'r'
          AND NOT idx.indisprimary
          AND NOT EXISTS (
              SELECT 1 FROM pg_constraint con
              WHERE con.conindid = idx.indexrelid
                AND con.conrelid = idx.indrelid
                AND con.contype IN ('p', 'u', 'x')
          )
          AND ($2::text IS NULL OR t.relname = $2)
        ORDER BY t.relname, i.relname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.table_name,
                IndexDescriptor {
                    name: row.index_name,
                    definition: row.definition,
                    method: row.method,
                    unique: row.is_unique,
                    key_expressions: row.key_expressions,
                    include_columns: row.include_columns,
                    predicate: row.predicate,
                },
            )
        })
        .collect())
}
