/// Helper to check if a schema name is a system schema.
/// System schemas are never merge sources, targets, or drop candidates.
pub fn is_system_schema(schema: &str) -> bool {
    matches!(schema, "pg_catalog" | "information_schema" | "pg_toast")
        || schema.starts_with("pg_temp_")
        || schema.starts_with("pg_toast_temp_")
}
