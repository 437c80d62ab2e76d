//! Constraint catalog - fetch unique, check and foreign-key constraints of one schema
use sqlx::postgres::PgConnection;
use tracing::{info, warn};

use crate::error::MergeResult;

/* ---------- Data structures ---------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Decode `pg_constraint.confupdtype` / `confdeltype`
    pub fn from_code(code: &str) -> Self {
        match code {
            "r" => ReferentialAction::Restrict,
            "c" => ReferentialAction::Cascade,
            "n" => ReferentialAction::SetNull,
            "d" => ReferentialAction::SetDefault,
            _ => ReferentialAction::NoAction,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    pub deferrable: bool,
    pub initially_deferred: bool,
}

impl ForeignKeyDescriptor {
    pub fn new(
        name: &str,
        columns: &[&str],
        referenced_schema: &str,
        referenced_table: &str,
        referenced_columns: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_schema: referenced_schema.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::NoAction,
            deferrable: false,
            initially_deferred: false,
        }
    }

    /// True when the constraint points back at the table that owns it
    pub fn is_self_reference(&self, schema: &str, table: &str) -> bool {
        self.referenced_schema == schema && self.referenced_table == table
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: String,
    /// Raw predicate, without the surrounding `CHECK (...)`
    pub expression: String,
}

/// Constraints of one table, as fetched
#[derive(Debug, Clone, Default)]
pub struct TableConstraints {
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub unique: Vec<UniqueConstraint>,
    pub checks: Vec<CheckConstraint>,
}

/* ---------- Fetch queries ---------- */

#[derive(Debug, sqlx::FromRow)]
struct ConstraintRow {
    table_name: String,
    constraint_name: String,
    constraint_type: String,
    columns: Vec<String>,
    foreign_schema: Option<String>,
    foreign_table: Option<String>,
    foreign_columns: Vec<String>,
    update_rule: String,
    delete_rule: String,
    deferrable: bool,
    initially_deferred: bool,
    check_expr: Option<String>,
}

async fn fetch_constraint_rows(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<Vec<ConstraintRow>> {
    let rows = sqlx::query_as::<_, ConstraintRow>(
        r#"
        SELECT
            cl.relname::text AS table_name,
            c.conname::text AS constraint_name,
            c.contype::text AS constraint_type,
            ARRAY(
                SELECT a.attname::text
                FROM unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS columns,
            fn.nspname::text AS foreign_schema,
            fcl.relname::text AS foreign_table,
            ARRAY(
                SELECT a.attname::text
                FROM unnest(c.confkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.confrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS foreign_columns,
            c.confupdtype::text AS update_rule,
            c.confdeltype::text AS delete_rule,
            c.condeferrable AS deferrable,
            c.condeferred AS initially_deferred,
            CASE
                WHEN c.contype = 'c' THEN pg_catalog.pg_get_expr(c.conbin, c.conrelid, true)
                ELSE NULL
            END AS check_expr
        FROM pg_constraint c
        JOIN pg_class cl ON c.conrelid = cl.oid
        JOIN pg_namespace n ON cl.relnamespace = n.oid
        LEFT JOIN pg_class fcl ON c.confrelid = fcl.oid
        LEFT JOIN pg_namespace fn ON fcl.relnamespace = fn.oid
        WHERE n.nspname = $1
          AND cl.relkind = 'r'
          AND c.contype IN ('u', 'f', 'c')
          AND ($2::text IS NULL OR cl.relname = $2)
        ORDER BY cl.relname, c.conname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Fetch constraints of `schema` (or one table of it), as `(table name, constraints)` pairs
/// in table name order. Foreign keys whose column lists do not pair up are dropped.
pub async fn fetch(
    conn: &mut PgConnection,
    schema: &str,
    table: Option<&str>,
) -> MergeResult<Vec<(String, TableConstraints)>> {
    info!("Fetching constraints of schema {}...", schema);
    let rows = fetch_constraint_rows(conn, schema, table).await?;

    let mut result: Vec<(String, TableConstraints)> = Vec::new();
    for row in rows {
        if result.last().is_none_or(|(name, _)| *name != row.table_name) {
            result.push((row.table_name.clone(), TableConstraints::default()));
        }
        let Some((_, constraints)) = result.last_mut() else {
            continue;
        };

        match row.constraint_type.as_str() {
            "u" => constraints.unique.push(UniqueConstraint {
                name: row.constraint_name,
                columns: row.columns,
            }),
            "c" => {
                if let Some(expression) = row.check_expr {
                    constraints.checks.push(CheckConstraint {
                        name: row.constraint_name,
                        expression,
                    });
                }
            }
            "f" => {
                let (Some(referenced_schema), Some(referenced_table)) =
                    (row.foreign_schema, row.foreign_table)
                else {
                    continue;
                };
                if row.columns.len() != row.foreign_columns.len() || row.columns.is_empty() {
                    warn!(
                        "Ignoring foreign key {} on {}.{}: column lists do not pair up",
                        row.constraint_name, schema, row.table_name
                    );
                    continue;
                }
                constraints.foreign_keys.push(ForeignKeyDescriptor {
                    name: row.constraint_name,
                    columns: row.columns,
                    referenced_schema,
                    referenced_table,
                    referenced_columns: row.foreign_columns,
                    on_update: ReferentialAction::from_code(&row.update_rule),
                    on_delete: ReferentialAction::from_code(&row.delete_rule),
                    deferrable: row.deferrable,
                    initially_deferred: row.initially_deferred,
                });
            }
            _ => {}
        }
    }

    Ok(result)
}
