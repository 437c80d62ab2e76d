use crate::config::{merge::Merge, types::*};
use crate::constants::DATABASE_URL_ENV;
use anyhow::{Result, anyhow};
use std::time::Duration;

pub struct ConfigBuilder {
    config_input: ConfigInput,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config_input: ConfigInput::default(),
        }
    }

    pub fn with_file(mut self, file_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(file_input);
        self
    }

    pub fn with_cli_args(mut self, cli_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(cli_input);
        self
    }

    pub fn resolve(self) -> Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            database: self.resolve_database(&defaults.database),
            merge: self.resolve_merge(&defaults.merge)?,
            audit: self.resolve_audit(&defaults.audit),
            tables: self.resolve_tables(&defaults.tables),
        })
    }

    fn resolve_database(&self, defaults: &Database) -> Database {
        let db_input = self.config_input.database.as_ref();

        // Explicit settings beat the environment
        let url = db_input
            .and_then(|d| d.url.as_ref())
            .cloned()
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .or_else(|| defaults.url.clone());

        let mut connection = defaults.connection.clone();
        if let Some(retries) = db_input.and_then(|d| d.max_retries) {
            connection.max_retries = retries;
        }
        if let Some(delay) = db_input.and_then(|d| d.retry_delay_ms) {
            connection.retry_delay = Duration::from_millis(delay);
        }
        if let Some(timeout) = db_input.and_then(|d| d.acquire_timeout_secs) {
            connection.acquire_timeout = Duration::from_secs(timeout);
        }

        Database { url, connection }
    }

    fn resolve_merge(&self, defaults: &MergeSettings) -> Result<MergeSettings> {
        let merge_input = self.config_input.merge.as_ref();

        let batch_size = merge_input
            .and_then(|m| m.batch_size)
            .or(defaults.batch_size);
        if batch_size == Some(0) {
            return Err(anyhow!("merge.batch_size must be greater than zero"));
        }

        Ok(MergeSettings {
            strategy: merge_input
                .and_then(|m| m.strategy)
                .unwrap_or(defaults.strategy),
            batch_size,
            create_target: merge_input
                .and_then(|m| m.create_target)
                .unwrap_or(defaults.create_target),
            lock_target: merge_input
                .and_then(|m| m.lock_target)
                .unwrap_or(defaults.lock_target),
            timeout: merge_input
                .and_then(|m| m.timeout_secs)
                .map(Duration::from_secs)
                .or(defaults.timeout),
        })
    }

    fn resolve_audit(&self, defaults: &Audit) -> Audit {
        let audit_input = self.config_input.audit.as_ref();

        Audit {
            enabled: audit_input
                .and_then(|a| a.enabled)
                .unwrap_or(defaults.enabled),
            table: AuditTable {
                schema: audit_input
                    .and_then(|a| a.schema.as_ref())
                    .cloned()
                    .unwrap_or_else(|| defaults.table.schema.clone()),
                name: audit_input
                    .and_then(|a| a.table.as_ref())
                    .cloned()
                    .unwrap_or_else(|| defaults.table.name.clone()),
            },
        }
    }

    fn resolve_tables(&self, defaults: &Tables) -> Tables {
        let tables_input = self.config_input.tables.as_ref();

        Tables {
            include: tables_input
                .and_then(|t| t.include.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.include.clone()),
            exclude: tables_input
                .and_then(|t| t.exclude.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.exclude.clone()),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
