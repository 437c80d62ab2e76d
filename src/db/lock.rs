use crate::error::{MergeError, MergeResult};
use sqlx::postgres::PgConnection;
use tracing::debug;

/// Take the transaction-scoped advisory lock guarding merges into `target`.
///
/// The lock is keyed on `hashtext(target)` and released by PostgreSQL at commit or rollback,
/// so there is nothing to unlock. Fails fast with [`MergeError::TargetLocked`] instead of
/// waiting when another transaction holds it.
pub async fn lock_target_schema(conn: &mut PgConnection, target: &str) -> MergeResult<()> {
    let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_xact_lock(hashtext($1))")
        .bind(target)
        .fetch_one(&mut *conn)
        .await?;

    if !acquired {
        return Err(MergeError::TargetLocked {
            target: target.to_string(),
        });
    }

    debug!("Holding merge lock for schema {}", target);
    Ok(())
}
