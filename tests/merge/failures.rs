use crate::helpers::harness::with_test_db;
use pgmerge::{ErrorKind, MergeRequest, MergeStrategy};

#[tokio::test]
async fn test_missing_source_schema() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.t (id INT PRIMARY KEY)")
            .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "nonexistent", "merged", true, MergeStrategy::Union)
            .await;

        assert!(!outcome.ok);
        assert_eq!(outcome.error_kind, Some(ErrorKind::SchemaNotFound));
        assert!(outcome.message.contains("does not exist"));
        assert!(outcome.message.contains("nonexistent"));
        assert!(outcome.details.is_none());
        assert!(!db.schema_exists("merged").await);
    })
    .await;
}

#[tokio::test]
async fn test_target_must_exist_when_not_created() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.t (id INT PRIMARY KEY)")
            .await;

        let outcome = db
            .merger()
            .merge_many_schemas(&["s1"], "merged", false, MergeStrategy::Union)
            .await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::SchemaNotFound));

        db.execute("CREATE SCHEMA merged").await;
        let outcome = db
            .merger()
            .merge_many_schemas(&["s1"], "merged", false, MergeStrategy::Union)
            .await;
        assert!(outcome.ok, "{}", outcome.message);
    })
    .await;
}

#[tokio::test]
async fn test_invalid_requests_touch_nothing() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA s1; CREATE TABLE s1.t (id INT PRIMARY KEY)")
            .await;
        let merger = db.merger();

        let outcome = merger
            .merge_two_schemas("s1", "s1", "merged", true, MergeStrategy::Union)
            .await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidRequest));

        let outcome = merger
            .merge_many_schemas(&["s1", "merged"], "merged", true, MergeStrategy::Union)
            .await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidRequest));
        assert!(outcome.message.contains("cannot also be a source"));

        let outcome = merger
            .merge_many_schemas::<&str>(&[], "merged", true, MergeStrategy::Union)
            .await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidRequest));

        let outcome = merger.merge_schemas_batched(&["s1"], "merged", true, 0).await;
        assert_eq!(outcome.error_kind, Some(ErrorKind::InvalidRequest));

        assert!(!db.schema_exists("merged").await);
    })
    .await;
}

#[tokio::test]
async fn test_constraint_violation_rolls_back_everything() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.accounts (id INT PRIMARY KEY, email TEXT UNIQUE);
            INSERT INTO s1.accounts VALUES (1, 'x@example.com');
            CREATE SCHEMA s2;
            CREATE TABLE s2.accounts (id INT PRIMARY KEY, email TEXT UNIQUE);
            INSERT INTO s2.accounts VALUES (2, 'x@example.com');",
        )
        .await;

        let outcome = db
            .merger()
            .merge_two_schemas("s1", "s2", "merged", true, MergeStrategy::Union)
            .await;

        assert!(!outcome.ok);
        assert_eq!(outcome.error_kind, Some(ErrorKind::ConstraintViolation));
        assert!(outcome.message.contains("accounts_email_key"), "{}", outcome.message);
        assert!(!db.schema_exists("merged").await);
    })
    .await;
}

#[tokio::test]
async fn test_duplicate_sources_collapse_with_warning() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.t (id INT PRIMARY KEY, v TEXT);
            INSERT INTO s1.t VALUES (1, 'a');",
        )
        .await;

        let details = db
            .merger()
            .run(MergeRequest::new(&["s1", "s1"], "merged"))
            .await
            .unwrap();

        assert_eq!(details.sources, vec!["s1"]);
        assert!(details.warnings[0].contains("listed more than once"));
        assert_eq!(db.pairs("merged.t").await, vec![(1, "a".to_string())]);
    })
    .await;
}
