//! A merge request, validated, and the plan it turns into once its sources are described
use sqlx::postgres::PgConnection;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::info;

use super::details::MergeDetails;
use super::strategy::MergeStrategy;
use super::{copy, ddl};
use crate::catalog::utils::is_system_schema;
use crate::catalog::{SchemaDescriptor, TableDescriptor};
use crate::error::{MergeError, MergeResult};
use crate::graph::DependencyGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// Source schemas, highest priority first
    pub sources: Vec<String>,
    pub target: String,
    /// Create the target schema when it does not exist yet
    pub create_target: bool,
    pub strategy: MergeStrategy,
    /// Copy in windows of this many rows instead of one statement per table
    pub batch_size: Option<usize>,
}

impl MergeRequest {
    pub fn new<S: AsRef<str>>(sources: &[S], target: &str) -> Self {
        Self {
            sources: sources.iter().map(|s| s.as_ref().to_string()).collect(),
            target: target.to_string(),
            create_target: true,
            strategy: MergeStrategy::default(),
            batch_size: None,
        }
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_create_target(mut self, create_target: bool) -> Self {
        self.create_target = create_target;
        self
    }

    /// Validate names and collapse repeated sources, keeping the first occurrence.
    /// Returns the cleaned request and a warning per collapsed duplicate.
    pub fn normalize(mut self) -> MergeResult<(Self, Vec<String>)> {
        if self.sources.is_empty() {
            return Err(MergeError::invalid("at least one source schema is required"));
        }
        if self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(MergeError::invalid("source schema names must not be empty"));
        }
        if self.target.trim().is_empty() {
            return Err(MergeError::invalid("target schema name must not be empty"));
        }
        if self.batch_size == Some(0) {
            return Err(MergeError::invalid("batch size must be greater than zero"));
        }
        if is_system_schema(&self.target) {
            return Err(MergeError::invalid(format!(
                "cannot merge into system schema \"{}\"",
                self.target
            )));
        }

        let mut warnings = Vec::new();
        let mut seen = BTreeSet::new();
        let mut unique = Vec::with_capacity(self.sources.len());
        for source in self.sources {
            if seen.insert(source.clone()) {
                unique.push(source);
            } else {
                warnings.push(format!(
                    "source schema \"{}\" listed more than once; keeping its first position",
                    source
                ));
            }
        }
        self.sources = unique;

        if self.sources.contains(&self.target) {
            return Err(MergeError::invalid(format!(
                "target schema \"{}\" cannot also be a source",
                self.target
            )));
        }

        Ok((self, warnings))
    }
}

/// Everything needed to run one merge inside one transaction
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub request: MergeRequest,
    /// Described sources in caller order, already narrowed by table filters
    pub sources: Vec<SchemaDescriptor>,
    /// Creation and load order over the union of the sources' tables
    pub order: Vec<String>,
}

impl MergeJob {
    /// Compute the load order. Fails with [`MergeError::CircularDependency`] before anything
    /// is written.
    pub fn plan(request: MergeRequest, sources: Vec<SchemaDescriptor>) -> MergeResult<Self> {
        let graph =
            DependencyGraph::from_tables(sources.iter().flat_map(|s| s.tables.values()));
        let order = graph.topological_order()?;
        info!(
            "Planned merge of {} table{} from {} source{}",
            order.len(),
            if order.len() == 1 { "" } else { "s" },
            sources.len(),
            if sources.len() == 1 { "" } else { "s" }
        );

        Ok(Self {
            request,
            sources,
            order,
        })
    }

    pub fn target(&self) -> &str {
        &self.request.target
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.request.strategy
    }

    pub fn in_universe(&self, table: &str) -> bool {
        self.sources.iter().any(|s| s.contains(table))
    }

    /// Sources holding `table`, in caller order
    pub fn holders(&self, table: &str) -> Vec<&SchemaDescriptor> {
        self.sources.iter().filter(|s| s.contains(table)).collect()
    }

    /// Sources whose rows go into `table` under the job's strategy
    pub fn contributors(&self, table: &str) -> Vec<&SchemaDescriptor> {
        let holders = self.holders(table);
        self.strategy().contributors(&holders).to_vec()
    }

    /// Definition used for the target table: the first source holding it
    pub fn definition(&self, table: &str) -> Option<&TableDescriptor> {
        self.sources.iter().find_map(|s| s.table(table))
    }

    fn initial_details(&self) -> MergeDetails {
        let mut details = MergeDetails {
            sources: self.request.sources.clone(),
            target: self.request.target.clone(),
            strategy: self.request.strategy,
            order: self.order.clone(),
            ..Default::default()
        };
        for table in &self.order {
            let holders = self.holders(table);
            if let [only] = holders.as_slice() {
                details
                    .only_in_one_source
                    .insert(table.clone(), only.name.clone());
            } else if holders.len() > 1 {
                details.shared_tables.push(table.clone());
            }
        }
        details
    }

    /// Run every write phase on `conn`, which the caller holds inside a transaction:
    /// create tables, load rows, activate foreign keys, re-seed sequences, rebuild indexes.
    pub async fn execute(&self, conn: &mut PgConnection) -> MergeResult<MergeDetails> {
        let started = Instant::now();
        let mut details = self.initial_details();

        if self.request.create_target {
            ddl::create_target_schema(conn, self.target()).await?;
        }

        info!("Creating {} tables in {}", self.order.len(), self.target());
        ddl::create_table_skeletons(conn, self, &mut details).await?;

        info!("Loading rows");
        for table in &self.order {
            copy::copy_table(conn, self, table, &mut details).await?;
        }

        info!("Activating foreign keys");
        ddl::activate_foreign_keys(conn, self, &mut details).await?;

        info!("Re-seeding sequences");
        ddl::reseed_sequences(conn, self, &mut details).await?;

        info!("Rebuilding indexes");
        ddl::rebuild_indexes(conn, self, &mut details).await?;

        details.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(details)
    }
}
