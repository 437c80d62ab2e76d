//! Row loading: one INSERT ... SELECT per contributing source, optionally windowed
use sqlx::postgres::PgConnection;
use tracing::{debug, info};

use super::details::MergeDetails;
use super::job::MergeJob;
use super::strategy::MergeStrategy;
use crate::catalog::TableDescriptor;
use crate::error::{MergeError, MergeResult};
use crate::render::sql::{ConflictAction, InsertSelect};

/// One `LIMIT`/`OFFSET` window of a batched copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub offset: u64,
    pub limit: u64,
}

/// Split `count` rows into windows of `size`. Zero rows means zero windows.
pub fn plan_batches(count: u64, size: u64) -> Vec<Batch> {
    if size == 0 {
        return vec![];
    }
    (0..count.div_ceil(size))
        .map(|i| Batch {
            offset: i * size,
            limit: size,
        })
        .collect()
}

/// Columns present in both the target definition and a source table, in target order.
/// Generated columns are left to the target to compute.
pub fn common_columns(target: &TableDescriptor, source: &TableDescriptor) -> Vec<String> {
    target
        .insertable_columns()
        .filter(|c| source.column(&c.name).is_some_and(|s| !s.is_generated()))
        .map(|c| c.name.clone())
        .collect()
}

/// Conflict handling for one source's insert into `target`.
///
/// The first source loaded into an empty table inserts plainly. Later sources under the
/// union strategy overwrite rows whose primary key they share, so the last listed source
/// wins. When the key cannot be addressed through the copied columns the collision is
/// dropped instead.
pub fn conflict_action(
    target: &TableDescriptor,
    columns: &[String],
    first: bool,
    strategy: MergeStrategy,
) -> ConflictAction {
    if first {
        return ConflictAction::None;
    }

    let key = target.primary_key_columns();
    if key.is_empty() || !key.iter().all(|k| columns.contains(k)) {
        return ConflictAction::DoNothing;
    }

    let key = key.to_vec();
    let set: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(c))
        .cloned()
        .collect();

    match strategy {
        MergeStrategy::Union if !set.is_empty() => ConflictAction::DoUpdate { key, set },
        _ => ConflictAction::DoNothingOn { key },
    }
}

/// Key to collapse a source's rows on before an upsert. Only needed when the source
/// does not itself guarantee that key is unique; otherwise two of its rows would hit the
/// same target row and Postgres rejects the statement.
pub fn dedupe_key<'a>(
    source: &TableDescriptor,
    conflict: &'a ConflictAction,
) -> Option<&'a [String]> {
    match conflict {
        ConflictAction::DoUpdate { key, .. } if source.primary_key_columns() != key.as_slice() => {
            Some(key.as_slice())
        }
        _ => None,
    }
}

/// Load `table` from every contributing source into the target.
///
/// A source sharing no insertable columns with the target definition is skipped and
/// recorded; every other statement failure aborts the merge.
pub async fn copy_table(
    conn: &mut PgConnection,
    job: &MergeJob,
    table: &str,
    details: &mut MergeDetails,
) -> MergeResult<()> {
    let Some(definition) = job.definition(table) else {
        return Ok(());
    };
    details.rows_copied.entry(table.to_string()).or_insert(0);

    let mut first = true;
    for source in job.contributors(table) {
        let Some(source_table) = source.table(table) else {
            continue;
        };

        let columns = common_columns(definition, source_table);
        if columns.is_empty() {
            let err = MergeError::ColumnMismatch {
                table: table.to_string(),
            };
            details.warn(format!("{} (source {})", err, source.name));
            details.skip(table, Some(&source.name), err.to_string());
            continue;
        }

        let conflict = conflict_action(definition, &columns, first, job.strategy());
        let insert = InsertSelect {
            target: job.target(),
            source: &source.name,
            table,
            columns: &columns,
            conflict: &conflict,
            distinct_on: dedupe_key(source_table, &conflict),
        };

        let rows = match job.request.batch_size {
            Some(size) => {
                let (rows, batches) =
                    copy_batched(conn, &insert, source_table.primary_key_columns(), size as u64)
                        .await?;
                *details.batches.entry(table.to_string()).or_insert(0) += batches;
                rows
            }
            None => {
                let sql = insert.render();
                debug!("{}", sql);
                sqlx::query(&sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| MergeError::from_statement(table, "", e))?
                    .rows_affected()
            }
        };

        info!("Copied {} rows into {} from {}", rows, table, source.name);
        *details.rows_copied.entry(table.to_string()).or_insert(0) += rows;
        details
            .provenance
            .entry(table.to_string())
            .or_default()
            .push(source.name.clone());
        first = false;
    }

    Ok(())
}

/// Copy one source table in ordered windows. Returns rows written and windows issued.
async fn copy_batched(
    conn: &mut PgConnection,
    insert: &InsertSelect<'_>,
    order_by: &[String],
    size: u64,
) -> MergeResult<(u64, usize)> {
    let (count,): (i64,) = sqlx::query_as(&insert.render_count())
        .fetch_one(&mut *conn)
        .await?;

    let batches = plan_batches(count.max(0) as u64, size);
    let mut rows = 0;
    for (i, batch) in batches.iter().enumerate() {
        let sql = insert.render_batch(order_by, batch.limit, batch.offset);
        debug!("batch {}/{}: {}", i + 1, batches.len(), sql);
        rows += sqlx::query(&sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| MergeError::from_statement(insert.table, "", e))?
            .rows_affected();
    }

    Ok((rows, batches.len()))
}
