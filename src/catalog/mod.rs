//! Read-only introspection of the tables of one schema
//!
//! Everything here comes from `pg_catalog`; nothing is inferred from row data.

use sqlx::Connection;
use sqlx::postgres::PgConnection;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{MergeError, MergeResult};

pub mod constraint;
pub mod index;
pub mod schema;
pub mod table;
pub mod utils;

pub use constraint::{
    CheckConstraint, ForeignKeyDescriptor, ReferentialAction, UniqueConstraint,
};
pub use index::IndexDescriptor;
pub use schema::{SchemaInfo, list_schemas, schema_exists, schema_size_bytes, table_exists};
pub use table::{ColumnDescriptor, IdentityKind, PrimaryKey, TableDescriptor, list_tables};

/// Snapshot of one schema's tables, keyed by table name
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub tables: BTreeMap<String, TableDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &String> {
        self.tables.keys()
    }

    /// Drop tables the predicate rejects, returning the names removed
    pub fn retain_tables<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let removed: Vec<String> = self
            .tables
            .keys()
            .filter(|name| !keep(name))
            .cloned()
            .collect();
        for name in &removed {
            self.tables.remove(name);
        }
        removed
    }
}

/// Describe every base table of `schema`.
///
/// Fails with [`MergeError::SchemaNotFound`] when the schema does not exist.
pub async fn describe_schema(conn: &mut PgConnection, schema: &str) -> MergeResult<SchemaDescriptor> {
    if !schema_exists(conn, schema).await? {
        return Err(MergeError::schema_not_found(schema));
    }

    let tables = with_qualified_names(conn, async |conn| load_tables(conn, schema, None).await).await?;
    info!("Described schema {} ({} tables)", schema, tables.len());

    Ok(SchemaDescriptor {
        name: schema.to_string(),
        tables,
    })
}

/// Describe a single table.
///
/// Fails with [`MergeError::SchemaNotFound`] or [`MergeError::TableNotFound`].
pub async fn describe_table(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> MergeResult<TableDescriptor> {
    if !schema_exists(conn, schema).await? {
        return Err(MergeError::schema_not_found(schema));
    }
    if !table_exists(conn, schema, table).await? {
        return Err(MergeError::TableNotFound {
            schema: schema.to_string(),
            table: table.to_string(),
        });
    }

    let mut tables =
        with_qualified_names(conn, async |conn| load_tables(conn, schema, Some(table)).await)
            .await?;
    tables
        .remove(table)
        .ok_or_else(|| MergeError::TableNotFound {
            schema: schema.to_string(),
            table: table.to_string(),
        })
}

/// Run catalog reads with `search_path` narrowed to `pg_catalog`, so `format_type` and
/// `pg_get_expr` qualify every user type, function and sequence with its schema.
///
/// The setting is local to a read-only transaction. If this future is dropped midway the
/// transaction is rolled back before the connection is used again, taking the setting
/// with it.
async fn with_qualified_names<T, F>(conn: &mut PgConnection, body: F) -> MergeResult<T>
where
    F: AsyncFnOnce(&mut PgConnection) -> MergeResult<T>,
{
    let mut tx = conn.begin().await?;
    sqlx::query("SELECT set_config('search_path', 'pg_catalog', true)")
        .execute(&mut *tx)
        .await?;
    let result = body(&mut *tx).await;
    tx.rollback().await?;
    result
}

async fn load_tables(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<BTreeMap<String, TableDescriptor>> {
    let mut tables = table::fetch(conn, schema, table).await?;

    for (table_name, constraints) in constraint::fetch(conn, schema, table).await? {
        if let Some(descriptor) = tables.get_mut(&table_name) {
            descriptor.foreign_keys = constraints.foreign_keys;
            descriptor.unique_constraints = constraints.unique;
            descriptor.check_constraints = constraints.checks;
        }
    }

    for (table_name, index) in index::fetch(conn, schema, table).await? {
        if let Some(descriptor) = tables.get_mut(&table_name) {
            descriptor.indexes.push(index);
        }
    }

    for descriptor in tables.values() {
        descriptor.validate().map_err(MergeError::InvalidRequest)?;
    }

    Ok(tables)
}
