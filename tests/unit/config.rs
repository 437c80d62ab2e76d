use anyhow::Result;
use pgmerge::MergeStrategy;
use pgmerge::config::{
    AuditInput, ConfigBuilder, ConfigInput, MergeInput, TableFilter, TablesInput, load_config,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Config file values are overridden by CLI values, key by key
mod config_integration_tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("pgmerge.yaml");
        fs::write(
            &path,
            r#"
database:
  url: postgres://localhost/from_file
  max_retries: 1
  retry_delay_ms: 50
merge:
  strategy: priority
  batch_size: 500
  timeout_secs: 60
audit:
  schema: ops
  table: merges
tables:
  exclude:
    - "tmp_*"
"#,
        )?;

        let file_config = load_config(path.to_str().unwrap())?;
        let cli_config = ConfigInput {
            merge: Some(MergeInput {
                strategy: Some(MergeStrategy::Union),
                create_target: Some(false),
                ..Default::default()
            }),
            audit: Some(AuditInput {
                enabled: Some(false),
                ..Default::default()
            }),
            tables: Some(TablesInput {
                include: Some(vec!["orders".to_string()]),
                exclude: None,
            }),
            ..Default::default()
        };

        let config = ConfigBuilder::new()
            .with_file(file_config)
            .with_cli_args(cli_config)
            .resolve()?;

        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/from_file")
        );
        assert_eq!(config.database.connection.max_retries, 1);
        assert_eq!(
            config.database.connection.retry_delay,
            Duration::from_millis(50)
        );

        assert_eq!(config.merge.strategy, MergeStrategy::Union);
        assert_eq!(config.merge.batch_size, Some(500));
        assert!(!config.merge.create_target);
        assert!(config.merge.lock_target);
        assert_eq!(config.merge.timeout, Some(Duration::from_secs(60)));

        assert!(!config.audit.enabled);
        assert_eq!(config.audit.table.schema, "ops");
        assert_eq!(config.audit.table.name, "merges");

        assert_eq!(config.tables.include, vec!["orders"]);
        assert_eq!(config.tables.exclude, vec!["tmp_*"]);
        Ok(())
    }

    #[test]
    fn test_missing_file_resolves_to_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let missing = temp_dir.path().join("nope.yaml");

        let config = ConfigBuilder::new()
            .with_file(load_config(missing.to_str().unwrap())?)
            .resolve()?;

        assert_eq!(config.merge.strategy, MergeStrategy::Union);
        assert!(config.audit.enabled);
        assert!(config.tables.include.is_empty());
        Ok(())
    }
}

mod table_filter_tests {
    use super::*;

    #[test]
    fn test_filter_from_resolved_config() -> Result<()> {
        let config = ConfigBuilder::new()
            .with_cli_args(ConfigInput {
                tables: Some(TablesInput {
                    include: Some(vec!["order*".to_string(), "customers".to_string()]),
                    exclude: Some(vec!["*_archive".to_string()]),
                }),
                ..Default::default()
            })
            .resolve()?;

        let filter = TableFilter::new(&config.tables, Some(&config.audit.table));

        assert!(filter.should_include_table("s1", "orders"));
        assert!(filter.should_include_table("s1", "order_items"));
        assert!(filter.should_include_table("s2", "customers"));
        assert!(!filter.should_include_table("s1", "orders_archive"));
        assert!(!filter.should_include_table("s1", "products"));
        assert!(!filter.should_include_table("public", "pgmerge_history"));
        Ok(())
    }
}
