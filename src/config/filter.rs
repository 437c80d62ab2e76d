use crate::catalog::SchemaDescriptor;
use crate::config::types::{AuditTable, Tables};
use glob::Pattern;
use tracing::{info, warn};

/// Table filter narrowing which tables of each source take part in a merge
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    audit_table: Option<AuditTable>,
}

impl TableFilter {
    /// Build a filter from configured glob patterns. Patterns that fail to parse are
    /// reported and ignored.
    pub fn new(config: &Tables, audit_table: Option<&AuditTable>) -> Self {
        Self {
            include: compile(&config.include),
            exclude: compile(&config.exclude),
            audit_table: audit_table.cloned(),
        }
    }

    /// Check if a table should be merged
    pub fn should_include_table(&self, schema_name: &str, table_name: &str) -> bool {
        // Never carry the history table along with user data
        if self.is_internal_table(schema_name, table_name) {
            return false;
        }

        if self.exclude.iter().any(|p| p.matches(table_name)) {
            return false;
        }

        // If include patterns are specified, table must match one of them
        if !self.include.is_empty() {
            return self.include.iter().any(|p| p.matches(table_name));
        }

        true
    }

    pub fn is_internal_table(&self, schema_name: &str, table_name: &str) -> bool {
        self.audit_table
            .as_ref()
            .is_some_and(|t| t.schema == schema_name && t.name == table_name)
    }

    /// Remove filtered tables from a described schema, returning the names dropped
    pub fn apply(&self, schema: &mut SchemaDescriptor) -> Vec<String> {
        let name = schema.name.clone();
        let removed = schema.retain_tables(|table| self.should_include_table(&name, table));
        if !removed.is_empty() {
            info!(
                "Filtered {} table(s) out of {}: {}",
                removed.len(),
                name,
                removed.join(", ")
            );
        }
        removed
    }
}

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| match Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Ignoring invalid table pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}
