use crate::helpers::harness::with_test_db;
use pgmerge::catalog::{IdentityKind, describe_schema, describe_table, list_tables};
use pgmerge::{ErrorKind, MergeError};
use std::time::Duration;

#[tokio::test]
async fn test_describe_basic_table() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(40) NOT NULL,
                email TEXT
            )",
        )
        .await;

        let mut conn = db.conn().await;
        let schema = describe_schema(&mut conn, "s1").await.unwrap();

        assert_eq!(schema.name, "s1");
        let table = schema.table("users").unwrap();
        assert_eq!(table.schema, "s1");
        assert_eq!(table.columns.len(), 3);

        assert_eq!(table.columns[0].name, "id");
        assert_eq!(table.columns[0].data_type, "integer");
        assert!(table.columns[0].not_null);
        // Catalog reads qualify the sequence with its schema
        assert_eq!(
            table.columns[0].default.as_deref(),
            Some("nextval('s1.users_id_seq'::regclass)")
        );
        assert!(table.columns[0].uses_sequence_default());

        assert_eq!(table.columns[1].data_type, "character varying(40)");
        assert!(table.columns[1].not_null);
        assert!(!table.columns[2].not_null);

        let pk = table.primary_key.as_ref().unwrap();
        assert_eq!(pk.name, "users_pkey");
        assert_eq!(pk.columns, vec!["id"]);
    })
    .await;
}

#[tokio::test]
async fn test_describe_identity_and_generated_columns() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.items (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                qty INT NOT NULL,
                price NUMERIC(10,2) NOT NULL,
                total NUMERIC GENERATED ALWAYS AS (qty * price) STORED
            )",
        )
        .await;

        let mut conn = db.conn().await;
        let table = describe_table(&mut conn, "s1", "items").await.unwrap();

        let id = table.column("id").unwrap();
        assert_eq!(id.identity, Some(IdentityKind::Always));
        assert!(id.default.is_none());

        let total = table.column("total").unwrap();
        assert!(total.is_generated());
        assert!(total.default.is_none());

        assert_eq!(
            table
                .insertable_columns()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>(),
            vec!["id", "qty", "price"]
        );
    })
    .await;
}

#[tokio::test]
async fn test_table_without_primary_key() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.events (payload JSONB)")
            .await;

        let mut conn = db.conn().await;
        let table = describe_table(&mut conn, "s1", "events").await.unwrap();
        assert!(table.primary_key.is_none());
        assert!(table.primary_key_columns().is_empty());
        assert_eq!(table.columns[0].data_type, "jsonb");
    })
    .await;
}

#[tokio::test]
async fn test_list_tables_ignores_views_and_sorts() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.zebra (id INT);
            CREATE TABLE s1.apple (id INT);
            CREATE VIEW s1.apple_view AS SELECT * FROM s1.apple;",
        )
        .await;

        let mut conn = db.conn().await;
        let tables = list_tables(&mut conn, "s1").await.unwrap();
        assert_eq!(tables, vec!["apple", "zebra"]);
    })
    .await;
}

#[tokio::test]
async fn test_missing_schema_and_table() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1").await;
        let mut conn = db.conn().await;

        let err = describe_schema(&mut conn, "nonexistent").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaNotFound);
        assert!(err.to_string().contains("does not exist"));

        let err = describe_table(&mut conn, "s1", "ghost").await.unwrap_err();
        assert!(matches!(err, MergeError::TableNotFound { ref table, .. } if table == "ghost"));
    })
    .await;
}

#[tokio::test]
async fn test_search_path_restored_after_describe() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.t (id INT)").await;
        let mut conn = db.conn().await;

        let (before,): (String,) = sqlx::query_as("SHOW search_path")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        describe_schema(&mut conn, "s1").await.unwrap();
        let (after,): (String,) = sqlx::query_as("SHOW search_path")
            .fetch_one(&mut *conn)
            .await
            .unwrap();

        assert_eq!(before, after);
    })
    .await;
}

#[tokio::test]
async fn test_search_path_survives_interrupted_describe() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT)")
            .await;
        let mut conn = db.conn().await;

        let (before,): (String,) = sqlx::query_as("SHOW search_path")
            .fetch_one(&mut *conn)
            .await
            .unwrap();

        // Cut the read off at various points; whether or not it finishes, the
        // connection must come back with its own search_path
        for micros in [0, 100, 500, 1_000, 2_000, 5_000, 10_000] {
            let limit = Duration::from_micros(micros);
            let _ = tokio::time::timeout(limit, describe_schema(&mut conn, "s1")).await;

            let (after,): (String,) = sqlx::query_as("SHOW search_path")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            assert_eq!(before, after, "after a {:?} limit", limit);
        }

        // Still usable for a full describe afterwards
        let schema = describe_schema(&mut conn, "s1").await.unwrap();
        assert!(schema.table("t").is_some());
    })
    .await;
}
