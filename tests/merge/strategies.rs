use crate::helpers::harness::{TestDatabase, with_test_db};
use pgmerge::MergeStrategy;

async fn seed_overlapping(db: &TestDatabase) {
    db.execute(
        "CREATE SCHEMA s1;
        CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT);
        INSERT INTO s1.t VALUES (1, 'a');
        CREATE SCHEMA s2;
        CREATE TABLE s2.t (id INT PRIMARY KEY, v TEXT);
        INSERT INTO s2.t VALUES (1, 'b'), (2, 'c');",
    )
    .await;
}

#[tokio::test]
async fn test_union_last_source_wins() {
    with_test_db(async |db| {
        seed_overlapping(db).await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;

        assert!(outcome.ok, "{}", outcome.message);
        assert_eq!(
            db.pairs("merged.t").await,
            vec![(1, "b".to_string()), (2, "c".to_string())]
        );

        let details = outcome.details.unwrap();
        assert_eq!(details.tables_created, vec!["t"]);
        assert_eq!(details.provenance["t"], vec!["s1", "s2"]);
        assert_eq!(details.shared_tables, vec!["t"]);
        // One plain insert, then one insert and one overwrite
        assert_eq!(details.rows_copied["t"], 3);
    })
    .await;
}

#[tokio::test]
async fn test_priority_first_source_only() {
    with_test_db(async |db| {
        seed_overlapping(db).await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Priority)
            .await;

        assert!(outcome.ok, "{}", outcome.message);
        assert_eq!(db.pairs("merged.t").await, vec![(1, "a".to_string())]);
        let details = outcome.details.unwrap();
        assert_eq!(details.provenance["t"], vec!["s1"]);
        assert_eq!(details.rows_copied["t"], 1);
    })
    .await;
}

#[tokio::test]
async fn test_table_in_one_source_is_copied_under_priority() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.a (id INT PRIMARY KEY);
            CREATE SCHEMA s2;
            CREATE TABLE s2.b (id INT PRIMARY KEY);
            INSERT INTO s2.b VALUES (7), (8);",
        )
        .await;

        let outcome = db
            .merger()
            .merge_many_schemas(&["s1", "s2"], "merged", true, MergeStrategy::Priority)
            .await;

        assert!(outcome.ok, "{}", outcome.message);
        assert_eq!(db.count("merged.b").await, 2);
        let details = outcome.details.unwrap();
        assert_eq!(details.only_in_one_source["b"], "s2");
        assert_eq!(details.only_in_one_source["a"], "s1");
    })
    .await;
}

#[tokio::test]
async fn test_column_intersection_and_defaults() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT, note TEXT DEFAULT 'n/a');
            INSERT INTO s1.t VALUES (1, 'a', 'first');
            CREATE SCHEMA s2;
            CREATE TABLE s2.t (id INT PRIMARY KEY, v TEXT, extra INT);
            INSERT INTO s2.t VALUES (2, 'b', 99);",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;
        assert!(outcome.ok, "{}", outcome.message);

        // The first source defines the table; s2's extra column is dropped
        let rows: Vec<(i32, String, String)> =
            sqlx::query_as("SELECT id, v, note FROM merged.t ORDER BY id")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![
                (1, "a".to_string(), "first".to_string()),
                (2, "b".to_string(), "n/a".to_string()),
            ]
        );
    })
    .await;
}

#[tokio::test]
async fn test_source_without_common_columns_is_skipped() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.t (id INT PRIMARY KEY);
            INSERT INTO s1.t VALUES (1);
            CREATE SCHEMA s2;
            CREATE TABLE s2.t (other INT);
            INSERT INTO s2.t VALUES (5);",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;
        assert!(outcome.ok, "{}", outcome.message);

        let details = outcome.details.unwrap();
        assert_eq!(details.skipped.len(), 1);
        assert_eq!(details.skipped[0].table, "t");
        assert_eq!(details.skipped[0].source.as_deref(), Some("s2"));
        assert!(details.warnings.iter().any(|w| w.contains("no columns in common")));
        assert_eq!(db.count("merged.t").await, 1);
    })
    .await;
}

#[tokio::test]
async fn test_keyless_tables_append() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.log (msg TEXT);
            INSERT INTO s1.log VALUES ('x');
            CREATE SCHEMA s2;
            CREATE TABLE s2.log (msg TEXT);
            INSERT INTO s2.log VALUES ('x'), ('y');",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;
        assert!(outcome.ok, "{}", outcome.message);
        // Nothing to conflict on, so duplicates are kept
        assert_eq!(db.count("merged.log").await, 3);
    })
    .await;
}

#[tokio::test]
async fn test_union_collapses_duplicate_keys_in_keyless_source() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT);
            INSERT INTO s1.t VALUES (1, 'a');
            CREATE SCHEMA s2;
            CREATE TABLE s2.t (id INT, v TEXT);
            INSERT INTO s2.t VALUES (1, 'b');
            INSERT INTO s2.t VALUES (1, 'c');",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;

        assert!(outcome.ok, "{}", outcome.message);
        // The later of s2's duplicates wins
        assert_eq!(db.pairs("merged.t").await, vec![(1, "c".to_string())]);
        assert_eq!(outcome.details.unwrap().provenance["t"], vec!["s1", "s2"]);
    })
    .await;
}
