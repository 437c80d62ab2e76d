//! Merge engine: validated requests become ordered, single-transaction merge jobs
//!
//! [`SchemaMerger`] is the library entry point. Every merge runs the same way:
//! describe the sources and plan the load order before touching anything, then create,
//! load and constrain the target inside one `REPEATABLE READ` transaction. Any failure
//! after `BEGIN` rolls the whole job back, including a target schema it created.

pub mod copy;
pub mod ddl;
pub mod details;
pub mod job;
pub mod strategy;

pub use copy::{Batch, common_columns, conflict_action, dedupe_key, plan_batches};
pub use details::{MergeDetails, MergeOutcome, SchemaComparison, SkippedTable};
pub use job::{MergeJob, MergeRequest};
pub use strategy::MergeStrategy;

use sqlx::postgres::{PgConnection, PgPool};
use sqlx::Connection;
use std::time::Duration;
use tracing::{info, warn};

use crate::audit::{self, MergeRecord};
use crate::catalog::{self, SchemaInfo, utils::is_system_schema};
use crate::config::{AuditTable, TableFilter};
use crate::db::{self, ConnectionConfig, lock_target_schema};
use crate::error::{MergeError, MergeResult};
use crate::render::quote_ident;

/// Knobs that apply to every merge a [`SchemaMerger`] runs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub filter: TableFilter,
    pub audit_table: AuditTable,
    /// Write a history record after each committed merge
    pub record_audit: bool,
    /// Take the transaction-scoped advisory lock on the target
    pub lock_target: bool,
    /// Roll back and fail with [`MergeError::Timeout`] past this limit
    pub timeout: Option<Duration>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        let audit_table = AuditTable::default();
        Self {
            filter: TableFilter::new(&Default::default(), Some(&audit_table)),
            audit_table,
            record_audit: true,
            lock_target: true,
            timeout: None,
        }
    }
}

/// Merges schemas of one database
#[derive(Debug, Clone)]
pub struct SchemaMerger {
    pool: PgPool,
    options: MergeOptions,
}

impl SchemaMerger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            options: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Connect with retries and build a merger with default options
    pub async fn connect(url: &str, config: &ConnectionConfig) -> MergeResult<Self> {
        Ok(Self::new(db::connect_with_retry_config(url, config).await?))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge exactly two distinct sources
    pub async fn merge_two_schemas(
        &self,
        source1: &str,
        source2: &str,
        target: &str,
        create_target: bool,
        strategy: MergeStrategy,
    ) -> MergeOutcome {
        if source1 == source2 {
            return MergeOutcome::failure(&MergeError::invalid(format!(
                "merging two schemas needs two different sources, got \"{}\" twice",
                source1
            )));
        }

        let request = MergeRequest::new(&[source1, source2], target)
            .with_create_target(create_target)
            .with_strategy(strategy);
        self.merge(request).await
    }

    pub async fn merge_many_schemas<S: AsRef<str>>(
        &self,
        sources: &[S],
        target: &str,
        create_target: bool,
        strategy: MergeStrategy,
    ) -> MergeOutcome {
        let request = MergeRequest::new(sources, target)
            .with_create_target(create_target)
            .with_strategy(strategy);
        self.merge(request).await
    }

    /// Union merge copying every source table in windows of `batch_size` rows
    pub async fn merge_schemas_batched<S: AsRef<str>>(
        &self,
        sources: &[S],
        target: &str,
        create_target: bool,
        batch_size: usize,
    ) -> MergeOutcome {
        let request = MergeRequest::new(sources, target)
            .with_create_target(create_target)
            .with_strategy(MergeStrategy::Union)
            .with_batch_size(Some(batch_size));
        self.merge(request).await
    }

    /// Run a request and fold the result into an outcome
    pub async fn merge(&self, request: MergeRequest) -> MergeOutcome {
        let result = self.run(request).await;
        if let Err(e) = &result {
            warn!("Merge failed: {}", e.labelled());
        }
        MergeOutcome::from(result)
    }

    /// Run a request, honouring the configured time limit
    pub async fn run(&self, request: MergeRequest) -> MergeResult<MergeDetails> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_to_completion(request))
                .await
                .unwrap_or(Err(MergeError::Timeout {
                    seconds: limit.as_secs(),
                })),
            None => self.run_to_completion(request).await,
        }
    }

    async fn run_to_completion(&self, request: MergeRequest) -> MergeResult<MergeDetails> {
        let (request, warnings) = request.normalize()?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| MergeError::Connection(e.to_string()))?;

        let job = self.plan(&mut conn, request).await?;
        let mut details = self.execute(&mut conn, &job).await?;
        let mut all_warnings = warnings;
        all_warnings.append(&mut details.warnings);
        details.warnings = all_warnings;
        info!("{}", details.summary());

        if self.options.record_audit {
            self.record(&mut conn, &details).await;
        }

        Ok(details)
    }

    /// Check names against the database, describe and filter the sources, order the tables.
    /// Nothing is written.
    async fn plan(&self, conn: &mut PgConnection, request: MergeRequest) -> MergeResult<MergeJob> {
        if !request.create_target && !catalog::schema_exists(conn, &request.target).await? {
            return Err(MergeError::schema_not_found(&request.target));
        }

        let mut sources = Vec::with_capacity(request.sources.len());
        for name in &request.sources {
            let mut schema = catalog::describe_schema(conn, name).await?;
            self.options.filter.apply(&mut schema);
            sources.push(schema);
        }

        MergeJob::plan(request, sources)
    }

    /// Run the job's write phases in one transaction, rolling back on any failure
    async fn execute(&self, conn: &mut PgConnection, job: &MergeJob) -> MergeResult<MergeDetails> {
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| MergeError::Transaction(format!("failed to begin: {}", e)))?;

        let result = async {
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
                .execute(&mut *tx)
                .await?;
            if self.options.lock_target {
                lock_target_schema(&mut tx, job.target()).await?;
            }
            job.execute(&mut tx).await
        }
        .await;

        match result {
            Ok(details) => {
                tx.commit()
                    .await
                    .map_err(|e| MergeError::Transaction(format!("failed to commit: {}", e)))?;
                Ok(details)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback after failed merge also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Best effort: the merge is already committed, so a failure here is only logged
    async fn record(&self, conn: &mut PgConnection, details: &MergeDetails) {
        let result = async {
            let size = catalog::schema_size_bytes(conn, &details.target).await?;
            audit::record_merge(conn, &self.options.audit_table, details, size).await
        }
        .await;

        if let Err(e) = result {
            warn!("Merge committed but its history record could not be written: {}", e);
        }
    }

    /// Base tables of `schema`, in name order
    pub async fn list_schema_tables(&self, schema: &str) -> MergeResult<Vec<String>> {
        let mut conn = self.acquire().await?;
        if !catalog::schema_exists(&mut conn, schema).await? {
            return Err(MergeError::schema_not_found(schema));
        }
        catalog::list_tables(&mut conn, schema).await
    }

    pub async fn compare_schemas(&self, a: &str, b: &str) -> MergeResult<SchemaComparison> {
        let tables_a = self.list_schema_tables(a).await?;
        let tables_b = self.list_schema_tables(b).await?;
        Ok(SchemaComparison::from_tables(&tables_a, &tables_b))
    }

    /// Non-system schemas with their table counts and sizes
    pub async fn list_schemas(&self) -> MergeResult<Vec<SchemaInfo>> {
        let mut conn = self.acquire().await?;
        catalog::list_schemas(&mut conn).await
    }

    pub async fn merge_history(&self) -> MergeResult<Vec<MergeRecord>> {
        let mut conn = self.acquire().await?;
        audit::merge_history(&mut conn, &self.options.audit_table).await
    }

    /// Drop `schema` with everything in it and forget its merge history.
    /// Returns the number of history records removed.
    pub async fn drop_schema(&self, schema: &str) -> MergeResult<u64> {
        if is_system_schema(schema) {
            return Err(MergeError::invalid(format!(
                "refusing to drop system schema \"{}\"",
                schema
            )));
        }
        if schema == self.options.audit_table.schema {
            return Err(MergeError::invalid(format!(
                "refusing to drop \"{}\", which holds the merge history",
                schema
            )));
        }

        let mut conn = self.acquire().await?;
        if !catalog::schema_exists(&mut conn, schema).await? {
            return Err(MergeError::schema_not_found(schema));
        }

        let mut tx = conn.begin().await?;
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", quote_ident(schema)))
            .execute(&mut *tx)
            .await?;
        let removed = audit::delete_records_for(&mut tx, &self.options.audit_table, schema).await?;
        tx.commit()
            .await
            .map_err(|e| MergeError::Transaction(format!("failed to commit: {}", e)))?;

        info!("Dropped schema {} ({} history records removed)", schema, removed);
        Ok(removed)
    }

    async fn acquire(&self) -> MergeResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| MergeError::Connection(e.to_string()))
    }
}
