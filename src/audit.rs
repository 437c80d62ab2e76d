//! Merge history kept in a tracking table next to the merged data
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgConnection;
use tracing::debug;

use crate::config::types::AuditTable;
use crate::error::{MergeError, MergeResult};
use crate::merge::MergeDetails;
use crate::render::qualified_name;

/// One row of the history table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MergeRecord {
    pub id: i64,
    pub target_schema: String,
    pub source_schemas: Vec<String>,
    pub strategy: String,
    pub created_at: DateTime<Utc>,
    pub table_count: i32,
    pub rows_copied: i64,
    pub total_size_bytes: i64,
    pub message: String,
}

/// Safely format the schema-qualified history table name.
///
/// Only plain identifiers (letters, digits, `_`, `$`, not starting with a digit) are
/// accepted, since the name is configured rather than discovered.
pub fn format_audit_table_name(audit_table: &AuditTable) -> MergeResult<String> {
    fn is_valid_sql_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_alphabetic() || first == '_' => {
                chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            }
            _ => false,
        }
    }

    for (what, name) in [("schema", &audit_table.schema), ("table", &audit_table.name)] {
        if !is_valid_sql_identifier(name) {
            return Err(MergeError::invalid(format!(
                "Invalid history {} name '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
                what, name
            )));
        }
    }

    Ok(qualified_name(&audit_table.schema, &audit_table.name))
}

/// Create the history table (and its schema) if missing
pub async fn ensure_audit_table(conn: &mut PgConnection, audit_table: &AuditTable) -> MergeResult<()> {
    let table_name = format_audit_table_name(audit_table)?;

    sqlx::query(&format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        crate::render::quote_ident(&audit_table.schema)
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id BIGSERIAL PRIMARY KEY,
            target_schema TEXT NOT NULL,
            source_schemas TEXT[] NOT NULL,
            strategy TEXT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
            table_count INTEGER NOT NULL,
            rows_copied BIGINT NOT NULL,
            total_size_bytes BIGINT NOT NULL,
            message TEXT NOT NULL
        )
        "#,
        table_name
    ))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Append a record for a committed merge
pub async fn record_merge(
    conn: &mut PgConnection,
    audit_table: &AuditTable,
    details: &MergeDetails,
    total_size_bytes: i64,
) -> MergeResult<()> {
    let table_name = format_audit_table_name(audit_table)?;
    ensure_audit_table(conn, audit_table).await?;

    sqlx::query(&format!(
        "INSERT INTO {} (target_schema, source_schemas, strategy, table_count, rows_copied, total_size_bytes, message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
        table_name
    ))
    .bind(&details.target)
    .bind(&details.sources)
    .bind(details.strategy.as_str())
    .bind(details.tables_created.len() as i32)
    .bind(details.total_rows() as i64)
    .bind(total_size_bytes)
    .bind(details.summary())
    .execute(&mut *conn)
    .await?;

    debug!("Recorded merge into {} in {}", details.target, table_name);
    Ok(())
}

async fn audit_table_exists(conn: &mut PgConnection, table_name: &str) -> MergeResult<bool> {
    let (exists,): (bool,) = sqlx::query_as("SELECT to_regclass($1) IS NOT NULL")
        .bind(table_name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// All recorded merges, newest first. Empty when nothing was ever recorded.
pub async fn merge_history(
    conn: &mut PgConnection,
    audit_table: &AuditTable,
) -> MergeResult<Vec<MergeRecord>> {
    let table_name = format_audit_table_name(audit_table)?;
    if !audit_table_exists(conn, &table_name).await? {
        return Ok(vec![]);
    }

    let records = sqlx::query_as::<_, MergeRecord>(&format!(
        "SELECT id, target_schema, source_schemas, strategy, created_at, table_count, rows_copied, total_size_bytes, message \
         FROM {} ORDER BY created_at DESC, id DESC",
        table_name
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(records)
}

/// Forget every merge into `target`. Returns the number of records removed.
pub async fn delete_records_for(
    conn: &mut PgConnection,
    audit_table: &AuditTable,
    target: &str,
) -> MergeResult<u64> {
    let table_name = format_audit_table_name(audit_table)?;
    if !audit_table_exists(conn, &table_name).await? {
        return Ok(0);
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE target_schema = $1",
        table_name
    ))
    .bind(target)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
