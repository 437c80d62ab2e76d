// Configuration file name
pub const CONFIG_FILENAME: &str = "pgmerge.yaml";

// Audit trail defaults
pub const DEFAULT_AUDIT_SCHEMA: &str = "public";
pub const DEFAULT_AUDIT_TABLE: &str = "pgmerge_history";

// Savepoint wrapped around each index rebuild
pub const INDEX_SAVEPOINT: &str = "pgmerge_index";

// Environment variable consulted for the connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
