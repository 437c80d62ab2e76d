use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::ConnectionConfig;
use crate::merge::MergeStrategy;

/// Raw configuration input - all fields Optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigInput {
    pub database: Option<DatabaseInput>,
    pub merge: Option<MergeInput>,
    pub audit: Option<AuditInput>,
    pub tables: Option<TablesInput>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: Database,
    pub merge: MergeSettings,
    pub audit: Audit,
    pub tables: Tables,
}

// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseInput {
    pub url: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Database {
    pub url: Option<String>,
    pub connection: ConnectionConfig,
}

impl Database {
    pub fn require_url(&self) -> anyhow::Result<&str> {
        self.url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No database URL configured. Pass --database-url, set DATABASE_URL, or add database.url to the config file"
            )
        })
    }
}

// Merge behaviour
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MergeInput {
    pub strategy: Option<MergeStrategy>,
    pub batch_size: Option<usize>,
    pub create_target: Option<bool>,
    pub lock_target: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub strategy: MergeStrategy,
    pub batch_size: Option<usize>,
    pub create_target: bool,
    pub lock_target: bool,
    pub timeout: Option<Duration>,
}

// Audit trail
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuditInput {
    pub enabled: Option<bool>,
    pub schema: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Audit {
    pub enabled: bool,
    pub table: AuditTable,
}

/// Location of the merge history table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTable {
    pub schema: String,
    pub name: String,
}

// Table filtering
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TablesInput {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

// CLI argument groups for command-specific options
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    #[arg(long, global = true, help = "PostgreSQL connection URL (overrides DATABASE_URL)")]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct MergeArgs {
    #[arg(long, value_enum, help = "How rows from several sources are reconciled")]
    pub strategy: Option<MergeStrategy>,

    #[arg(long, help = "Copy rows in windows of this size")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Fail instead of creating a missing target schema")]
    pub no_create_target: bool,

    #[arg(long, help = "Do not take the advisory lock on the target schema")]
    pub no_lock: bool,

    #[arg(long, help = "Abort and roll back after this many seconds")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Do not record the merge in the history table")]
    pub no_audit: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct TableFilterArgs {
    #[arg(long, value_delimiter = ',', help = "Merge only these tables (glob patterns)")]
    pub tables: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',', help = "Leave these tables out (glob patterns)")]
    pub exclude_tables: Option<Vec<String>>,
}

// Conversion functions from CLI args to config input
impl From<DatabaseArgs> for DatabaseInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            url: args.database_url,
            ..Default::default()
        }
    }
}

impl From<MergeArgs> for MergeInput {
    fn from(args: MergeArgs) -> Self {
        Self {
            strategy: args.strategy,
            batch_size: args.batch_size,
            // Flags only ever switch behaviour off; absent flags defer to the file
            create_target: args.no_create_target.then_some(false),
            lock_target: args.no_lock.then_some(false),
            timeout_secs: args.timeout_secs,
        }
    }
}

impl From<MergeArgs> for AuditInput {
    fn from(args: MergeArgs) -> Self {
        Self {
            enabled: args.no_audit.then_some(false),
            schema: None,
            table: None,
        }
    }
}

impl From<TableFilterArgs> for TablesInput {
    fn from(args: TableFilterArgs) -> Self {
        Self {
            include: args.tables,
            exclude: args.exclude_tables,
        }
    }
}
