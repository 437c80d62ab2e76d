use crate::config::types::*;

/// Trait for merging optional configuration values
pub trait Merge<T> {
    fn merge(self, other: T) -> T;
}

impl<T> Merge<Option<T>> for Option<T> {
    fn merge(self, other: Option<T>) -> Option<T> {
        other.or(self)
    }
}

/// Merge two optional sections field by field, `b` winning where both are set
fn merge_sections<T>(a: Option<T>, b: Option<T>, merge_with: impl FnOnce(T, T) -> T) -> Option<T> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (Some(a), Some(b)) => Some(merge_with(a, b)),
    }
}

impl Merge<ConfigInput> for ConfigInput {
    fn merge(self, other: ConfigInput) -> ConfigInput {
        ConfigInput {
            database: merge_sections(self.database, other.database, DatabaseInput::merge_with),
            merge: merge_sections(self.merge, other.merge, MergeInput::merge_with),
            audit: merge_sections(self.audit, other.audit, AuditInput::merge_with),
            tables: merge_sections(self.tables, other.tables, TablesInput::merge_with),
        }
    }
}

impl DatabaseInput {
    pub fn merge_with(self, other: DatabaseInput) -> DatabaseInput {
        DatabaseInput {
            url: self.url.merge(other.url),
            max_retries: self.max_retries.merge(other.max_retries),
            retry_delay_ms: self.retry_delay_ms.merge(other.retry_delay_ms),
            acquire_timeout_secs: self.acquire_timeout_secs.merge(other.acquire_timeout_secs),
        }
    }
}

impl MergeInput {
    pub fn merge_with(self, other: MergeInput) -> MergeInput {
        MergeInput {
            strategy: self.strategy.merge(other.strategy),
            batch_size: self.batch_size.merge(other.batch_size),
            create_target: self.create_target.merge(other.create_target),
            lock_target: self.lock_target.merge(other.lock_target),
            timeout_secs: self.timeout_secs.merge(other.timeout_secs),
        }
    }
}

impl AuditInput {
    pub fn merge_with(self, other: AuditInput) -> AuditInput {
        AuditInput {
            enabled: self.enabled.merge(other.enabled),
            schema: self.schema.merge(other.schema),
            table: self.table.merge(other.table),
        }
    }
}

impl TablesInput {
    pub fn merge_with(self, other: TablesInput) -> TablesInput {
        TablesInput {
            include: self.include.merge(other.include),
            exclude: self.exclude.merge(other.exclude),
        }
    }
}
