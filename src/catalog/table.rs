//! Fetch table columns and primary keys via pg_catalog for BASE TABLEs of one schema
use sqlx::postgres::PgConnection;
use std::collections::BTreeMap;
use tracing::info;

use super::constraint::{CheckConstraint, ForeignKeyDescriptor, UniqueConstraint};
use super::index::IndexDescriptor;
use crate::error::MergeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Always,
    ByDefault,
}

impl IdentityKind {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(IdentityKind::Always),
            "d" => Some(IdentityKind::ByDefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type as rendered by `format_type`, e.g. `character varying(40)`
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub identity: Option<IdentityKind>,
    /// Expression of a stored generated column
    pub generated: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            not_null: false,
            default: None,
            identity: None,
            generated: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// Default draws from a sequence, as SERIAL columns do
    pub fn uses_sequence_default(&self) -> bool {
        self.default
            .as_deref()
            .is_some_and(|d| d.trim_start().starts_with("nextval("))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.data_type.as_str(), "smallint" | "integer" | "bigint")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub check_constraints: Vec<CheckConstraint>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableDescriptor {
    pub fn new(schema: &str, name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
            primary_key: None,
            foreign_keys: vec![],
            unique_constraints: vec![],
            check_constraints: vec![],
            indexes: vec![],
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Columns that accept explicit values on insert (everything but generated columns)
    pub fn insertable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_generated())
    }

    /// Check that key and foreign-key columns are drawn from the table's own columns
    pub fn validate(&self) -> Result<(), String> {
        for column in self.primary_key_columns() {
            if !self.has_column(column) {
                return Err(format!(
                    "primary key of {}.{} names unknown column {}",
                    self.schema, self.name, column
                ));
            }
        }

        for fk in &self.foreign_keys {
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(format!(
                    "foreign key {} on {}.{} pairs {} local columns with {} referenced columns",
                    fk.name,
                    self.schema,
                    self.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ));
            }
            if let Some(missing) = fk.columns.iter().find(|c| !self.has_column(c)) {
                return Err(format!(
                    "foreign key {} on {}.{} names unknown column {}",
                    fk.name, self.schema, self.name, missing
                ));
            }
        }

        Ok(())
    }
}

/* ---------- Fetch queries ---------- */

/// List base tables of a schema, in name order
pub async fn list_tables(conn: &mut PgConnection, schema: &str) -> MergeResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT c.relname::text
        FROM pg_class c
        JOIN pg_namespace n ON c.relnamespace = n.oid
        WHERE n.nspname = $1
          AND c.relkind = 'r'
        ORDER BY c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

#[derive(Debug, sqlx::FromRow)]
struct ColumnRow {
    table_name: String,
    column_name: String,
    data_type: String,
    not_null: bool,
    default_expr: Option<String>,
    generated_expr: Option<String>,
    identity: Option<String>,
}

async fn fetch_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<Vec<ColumnRow>> {
    let rows = sqlx::query_as::<_, ColumnRow>(
        r#"
        SELECT
          c.relname::text AS table_name,
          a.attname::text AS column_name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
          a.attnotnull AS not_null,
          CASE WHEN a.attgenerated::text <> 's'
               THEN pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) END AS default_expr,
          CASE WHEN a.attgenerated::text = 's'
               THEN pg_catalog.pg_get_expr(ad.adbin, ad.adrelid) END AS generated_expr,
          NULLIF(a.attidentity::text, '') AS identity
        FROM pg_attribute a
        JOIN pg_class c ON a.attrelid = c.oid
        JOIN pg_namespace n ON c.relnamespace = n.oid
        LEFT JOIN pg_attrdef ad
          ON a.attrelid = ad.adrelid
         AND a.attnum   = ad.adnum
        WHERE n.nspname = $1
          AND c.relkind = 'r'
          AND a.attnum > 0
          AND NOT a.attisdropped
          AND ($2::text IS NULL OR c.relname = $2)
        ORDER BY c.relname, a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct PrimaryKeyRow {
    table_name: String,
    constraint_name: String,
    columns: Vec<String>,
}

async fn fetch_primary_keys(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<Vec<PrimaryKeyRow>> {
    let rows = sqlx::query_as::<_, PrimaryKeyRow>(
        r#"
        SELECT
          cl.relname::text AS table_name,
          c.conname::text AS constraint_name,
          ARRAY(
            SELECT a.attname::text
            FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
            ORDER BY k.ord
          ) AS columns
        FROM pg_constraint c
        JOIN pg_class cl ON c.conrelid = cl.oid
        JOIN pg_namespace n ON cl.relnamespace = n.oid
        WHERE n.nspname = $1
          AND cl.relkind = 'r'
          AND c.contype = 'p'
          AND ($2::text IS NULL OR cl.relname = $2)
        ORDER BY cl.relname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Fetch tables of `schema` (or just `table`, which the caller has checked exists)
/// with columns and primary keys. Constraints and indexes are attached by the caller.
pub async fn fetch(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<BTreeMap<String, TableDescriptor>> {
    info!("Fetching tables of schema {}...", schema);

    let names = match table {
        Some(name) => vec![name.to_string()],
        None => list_tables(conn, schema).await?,
    };
    let mut tables: BTreeMap<String, TableDescriptor> = names
        .into_iter()
        .map(|name| {
            let descriptor = TableDescriptor::new(schema, &name, vec![]);
            (name, descriptor)
        })
        .collect();

    for row in fetch_columns(conn, schema, table).await? {
        let Some(descriptor) = tables.get_mut(&row.table_name) else {
            continue;
        };
        let identity = row.identity.as_deref().and_then(IdentityKind::from_code);
        descriptor.columns.push(ColumnDescriptor {
            name: row.column_name,
            data_type: row.data_type,
            not_null: row.not_null,
            // Identity columns carry no attrdef entry; anything else here is a real default
            default: if identity.is_some() {
                None
            } else {
                row.default_expr
            },
            identity,
            generated: row.generated_expr,
        });
    }

    for row in fetch_primary_keys(conn, schema, table).await? {
        if let Some(descriptor) = tables.get_mut(&row.table_name) {
            descriptor.primary_key = Some(PrimaryKey {
                name: row.constraint_name,
                columns: row.columns,
            });
        }
    }

    Ok(tables)
}
