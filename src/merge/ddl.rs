//! Schema-shaping phases of a merge: target schema, table skeletons, foreign keys,
//! sequences and indexes
use sqlx::postgres::PgConnection;
use tracing::{debug, info};

use super::details::MergeDetails;
use super::job::MergeJob;
use crate::constants::INDEX_SAVEPOINT;
use crate::db::SqlErrorContext;
use crate::error::{MergeError, MergeResult};
use crate::render::quote_ident;
use crate::render::sql::{
    render_add_foreign_key, render_create_index, render_create_schema, render_create_sequence,
    render_create_table, render_drop_table, render_reseed, render_sequence_owned_by,
    sequence_backed_columns,
};

async fn execute(conn: &mut PgConnection, sql: &str) -> Result<(), sqlx::Error> {
    debug!("{}", sql);
    sqlx::query(sql).execute(&mut *conn).await?;
    Ok(())
}

pub async fn create_target_schema(conn: &mut PgConnection, target: &str) -> MergeResult<()> {
    execute(conn, &render_create_schema(target)).await?;
    Ok(())
}

/// Replace every table of the merge in the target with an empty copy of its definition.
/// Foreign keys are left out until the rows are in.
pub async fn create_table_skeletons(
    conn: &mut PgConnection,
    job: &MergeJob,
    details: &mut MergeDetails,
) -> MergeResult<()> {
    let target = job.target();

    for table in &job.order {
        let Some(definition) = job.definition(table) else {
            continue;
        };

        execute(conn, &render_drop_table(target, table)).await?;

        let owned: Vec<&str> = sequence_backed_columns(definition)
            .map(|c| c.name.as_str())
            .collect();
        for column in &owned {
            execute(conn, &render_create_sequence(target, table, column)).await?;
        }

        execute(conn, &render_create_table(target, definition))
            .await
            .map_err(|e| MergeError::from_statement(table, "", e))?;

        for column in &owned {
            execute(conn, &render_sequence_owned_by(target, table, column)).await?;
        }

        details.tables_created.push(table.clone());
    }

    info!("Created {} tables in {}", details.tables_created.len(), target);
    Ok(())
}

/// Add each table's foreign keys now that every referenced row is loaded.
///
/// References between merged tables point at the target; references to other schemas keep
/// their schema. A same-schema reference to a table outside the merge cannot be satisfied
/// and is skipped with a warning.
pub async fn activate_foreign_keys(
    conn: &mut PgConnection,
    job: &MergeJob,
    details: &mut MergeDetails,
) -> MergeResult<()> {
    let target = job.target();

    for table in &job.order {
        let Some(definition) = job.definition(table) else {
            continue;
        };

        for fk in &definition.foreign_keys {
            let referenced_schema = if fk.referenced_schema == definition.schema {
                if !job.in_universe(&fk.referenced_table) {
                    details.warn(format!(
                        "foreign key {} on {} references {}, which is not part of the merge; constraint not created",
                        fk.name, table, fk.referenced_table
                    ));
                    continue;
                }
                target
            } else {
                fk.referenced_schema.as_str()
            };

            execute(
                conn,
                &render_add_foreign_key(target, table, fk, referenced_schema),
            )
            .await
            .map_err(|e| MergeError::from_statement(table, &fk.name, e))?;

            details
                .foreign_keys_activated
                .push(format!("{}.{}", table, fk.name));
        }
    }

    Ok(())
}

/// Move sequences and identities past the largest loaded value so later inserts do not collide
pub async fn reseed_sequences(
    conn: &mut PgConnection,
    job: &MergeJob,
    details: &mut MergeDetails,
) -> MergeResult<()> {
    let target = job.target();

    for table in &job.order {
        let Some(definition) = job.definition(table) else {
            continue;
        };

        for column in definition
            .columns
            .iter()
            .filter(|c| (c.identity.is_some() || c.uses_sequence_default()) && c.is_integer())
        {
            execute(conn, &render_reseed(target, table, &column.name)).await?;
            details
                .sequences_reseeded
                .push(format!("{}.{}", table, column.name));
        }
    }

    Ok(())
}

/// Recreate secondary indexes. Each runs under a savepoint: a failed index is reported as a
/// warning and the merge carries on.
pub async fn rebuild_indexes(
    conn: &mut PgConnection,
    job: &MergeJob,
    details: &mut MergeDetails,
) -> MergeResult<()> {
    let target = job.target();
    let savepoint = quote_ident(INDEX_SAVEPOINT);

    for table in &job.order {
        let Some(definition) = job.definition(table) else {
            continue;
        };

        for index in &definition.indexes {
            execute(conn, &format!("SAVEPOINT {}", savepoint)).await?;

            match execute(conn, &render_create_index(target, table, index)).await {
                Ok(()) => {
                    execute(conn, &format!("RELEASE SAVEPOINT {}", savepoint)).await?;
                    details.indexes_rebuilt.push(index.name.clone());
                }
                Err(e) => {
                    execute(conn, &format!("ROLLBACK TO SAVEPOINT {}", savepoint)).await?;
                    execute(conn, &format!("RELEASE SAVEPOINT {}", savepoint)).await?;
                    let context = SqlErrorContext::from_sqlx_error(&e);
                    details.warn(format!(
                        "index {} on {} could not be rebuilt: {}",
                        index.name,
                        table,
                        context.summary()
                    ));
                }
            }
        }
    }

    Ok(())
}
