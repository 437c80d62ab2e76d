use crate::helpers::harness::with_test_db;
use pgmerge::catalog::describe_table;

#[tokio::test]
async fn test_secondary_indexes_only() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.users (
                id INT PRIMARY KEY,
                email TEXT UNIQUE,
                name TEXT,
                archived BOOLEAN NOT NULL DEFAULT false
            );
            CREATE INDEX users_name_idx ON s1.users (lower(name));
            CREATE UNIQUE INDEX users_active_email_idx ON s1.users (email) WHERE NOT archived;",
        )
        .await;

        let mut conn = db.conn().await;
        let table = describe_table(&mut conn, "s1", "users").await.unwrap();

        // users_pkey and users_email_key come back with their constraints
        let names: Vec<&str> = table.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["users_active_email_idx", "users_name_idx"]);

        let partial = &table.indexes[0];
        assert!(partial.unique);
        assert_eq!(partial.method, "btree");
        assert_eq!(partial.key_expressions, vec!["email"]);
        assert_eq!(partial.predicate.as_deref(), Some("NOT archived"));
        assert!(
            partial
                .definition_tail()
                .unwrap()
                .starts_with("USING btree (email)")
        );

        let expression = &table.indexes[1];
        assert!(!expression.unique);
        assert_eq!(expression.key_expressions, vec!["lower(name)"]);
    })
    .await;
}
