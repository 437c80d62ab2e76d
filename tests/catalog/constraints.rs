use crate::helpers::harness::with_test_db;
use pgmerge::catalog::{ReferentialAction, describe_schema};

#[tokio::test]
async fn test_foreign_keys_unique_and_checks() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA s1;
            CREATE TABLE s1.customers (
                id INT PRIMARY KEY,
                email TEXT UNIQUE
            );
            CREATE TABLE s1.orders (
                id INT PRIMARY KEY,
                customer_id INT REFERENCES s1.customers(id) ON DELETE CASCADE,
                amount NUMERIC CONSTRAINT positive_amount CHECK (amount > 0)
            );",
        )
        .await;

        let mut conn = db.conn().await;
        let schema = describe_schema(&mut conn, "s1").await.unwrap();

        let customers = schema.table("customers").unwrap();
        assert_eq!(customers.unique_constraints.len(), 1);
        assert_eq!(customers.unique_constraints[0].columns, vec!["email"]);
        assert!(customers.foreign_keys.is_empty());

        let orders = schema.table("orders").unwrap();
        assert_eq!(orders.foreign_keys.len(), 1);
        let fk = &orders.foreign_keys[0];
        assert_eq!(fk.name, "orders_customer_id_fkey");
        assert_eq!(fk.columns, vec!["customer_id"]);
        assert_eq!(fk.referenced_schema, "s1");
        assert_eq!(fk.referenced_table, "customers");
        assert_eq!(fk.referenced_columns, vec!["id"]);
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);
        assert!(!fk.deferrable);

        assert_eq!(orders.check_constraints.len(), 1);
        assert_eq!(orders.check_constraints[0].name, "positive_amount");
        assert!(orders.check_constraints[0].expression.contains("amount > "));
    })
    .await;
}

#[tokio::test]
async fn test_composite_and_cross_schema_foreign_keys() {
    with_test_db(async |db| {
        db.execute(
            "CREATE SCHEMA shared;
            CREATE TABLE shared.countries (code TEXT PRIMARY KEY);
            CREATE SCHEMA s1;
            CREATE TABLE s1.parents (a INT, b INT, PRIMARY KEY (a, b));
            CREATE TABLE s1.children (
                id INT PRIMARY KEY,
                pa INT,
                pb INT,
                country TEXT REFERENCES shared.countries(code),
                FOREIGN KEY (pa, pb) REFERENCES s1.parents(a, b) DEFERRABLE INITIALLY DEFERRED
            );",
        )
        .await;

        let mut conn = db.conn().await;
        let schema = describe_schema(&mut conn, "s1").await.unwrap();
        let children = schema.table("children").unwrap();
        assert_eq!(children.foreign_keys.len(), 2);

        let composite = children
            .foreign_keys
            .iter()
            .find(|fk| fk.referenced_table == "parents")
            .unwrap();
        assert_eq!(composite.columns, vec!["pa", "pb"]);
        assert_eq!(composite.referenced_columns, vec!["a", "b"]);
        assert!(composite.deferrable);
        assert!(composite.initially_deferred);

        let external = children
            .foreign_keys
            .iter()
            .find(|fk| fk.referenced_table == "countries")
            .unwrap();
        assert_eq!(external.referenced_schema, "shared");
    })
    .await;
}
