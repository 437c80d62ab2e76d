use serde::Serialize;
use sqlx::postgres::PgConnection;
use tracing::info;

use crate::error::MergeResult;

/// A user schema with its table count and on-disk footprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SchemaInfo {
    pub name: String,
    pub table_count: i64,
    pub total_size_bytes: i64,
}

pub async fn schema_exists(conn: &mut PgConnection, schema: &str) -> MergeResult<bool> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(schema)
            .fetch_one(&mut *conn)
            .await?;
    Ok(exists)
}

pub async fn table_exists(conn: &mut PgConnection, schema: &str, table: &str) -> MergeResult<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM pg_class c
            JOIN pg_namespace n ON c.relnamespace = n.oid
            WHERE n.nspname = $1 AND c.relname = $2 AND c.relkind = 'r'
        )
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Non-system schemas with table count and total relation size, in name order
pub async fn list_schemas(conn: &mut PgConnection) -> MergeResult<Vec<SchemaInfo>> {
    info!("Fetching schemas...");
    let rows = sqlx::query_as::<_, SchemaInfo>(
        r#"
        SELECT
            n.nspname::text AS name,
            COUNT(c.oid) AS table_count,
            COALESCE(SUM(pg_total_relation_size(c.oid)), 0)::bigint AS total_size_bytes
        FROM pg_namespace n
        LEFT JOIN pg_class c ON c.relnamespace = n.oid AND c.relkind = 'r'
        WHERE n.nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
          AND n.nspname NOT LIKE 'pg_temp_%'
          AND n.nspname NOT LIKE 'pg_toast_temp_%'
        GROUP BY n.nspname
        ORDER BY n.nspname
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Total size in bytes of the base tables in `schema`, indexes and TOAST included
pub async fn schema_size_bytes(conn: &mut PgConnection, schema: &str) -> MergeResult<i64> {
    let (size,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(pg_total_relation_size(c.oid)), 0)::bigint
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        WHERE n.nspname = $1 AND c.relkind = 'r'
        "#,
    )
    .bind(schema)
    .fetch_one(&mut *conn)
    .await?;
    Ok(size)
}
