use crate::helpers::harness::{TestDatabase, with_test_db};
use pgmerge::MergeStrategy;

async fn seed(db: &TestDatabase) {
    db.execute(
        "CREATE SCHEMA s1;
        CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT);
        INSERT INTO s1.t VALUES (1, 'a'), (3, 'x');
        CREATE TABLE s1.notes (id SERIAL PRIMARY KEY, t_id INT REFERENCES s1.t(id));
        INSERT INTO s1.notes (t_id) VALUES (1), (3);
        CREATE SCHEMA s2;
        CREATE TABLE s2.t (id INT PRIMARY KEY, v TEXT);
        INSERT INTO s2.t VALUES (1, 'b'), (2, 'c');",
    )
    .await;
}

#[tokio::test]
async fn test_rerunning_a_merge_replaces_the_target() {
    with_test_db(async |db| {
        seed(db).await;
        let merger = db.merger();

        let first = merger
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;
        assert!(first.ok, "{}", first.message);
        let rows_after_first = db.pairs("merged.t").await;

        let second = merger
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;
        assert!(second.ok, "{}", second.message);

        assert_eq!(db.pairs("merged.t").await, rows_after_first);
        assert_eq!(
            rows_after_first,
            vec![
                (1, "b".to_string()),
                (2, "c".to_string()),
                (3, "x".to_string())
            ]
        );
        assert_eq!(db.count("merged.notes").await, 2);

        let first = first.details.unwrap();
        let second = second.details.unwrap();
        assert_eq!(first.rows_copied, second.rows_copied);
        assert_eq!(first.tables_created, second.tables_created);
        assert_eq!(first.foreign_keys_activated, second.foreign_keys_activated);
    })
    .await;
}

#[tokio::test]
async fn test_rerun_into_existing_target_keeps_unrelated_tables() {
    with_test_db(async |db| {
        seed(db).await;
        db.execute(
            "CREATE SCHEMA merged;
            CREATE TABLE merged.keep_me (id INT);
            INSERT INTO merged.keep_me VALUES (42);",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", false, MergeStrategy::Priority)
            .await;
        assert!(outcome.ok, "{}", outcome.message);

        assert_eq!(db.count("merged.keep_me").await, 1);
        // Priority: s1 holds t, so s2's rows never arrive
        assert_eq!(
            db.pairs("merged.t").await,
            vec![(1, "a".to_string()), (3, "x".to_string())]
        );
    })
    .await;
}
