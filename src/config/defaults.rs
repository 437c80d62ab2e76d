use crate::config::types::*;
use crate::constants::{DEFAULT_AUDIT_SCHEMA, DEFAULT_AUDIT_TABLE};
use crate::merge::MergeStrategy;

// Config, Database and Tables derive Default

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::Union,
            batch_size: None,
            create_target: true,
            lock_target: true,
            timeout: None,
        }
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self {
            enabled: true,
            table: AuditTable::default(),
        }
    }
}

impl Default for AuditTable {
    fn default() -> Self {
        Self {
            schema: DEFAULT_AUDIT_SCHEMA.to_string(),
            name: DEFAULT_AUDIT_TABLE.to_string(),
        }
    }
}
