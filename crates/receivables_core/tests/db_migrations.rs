use receivables_core::db::migrations::latest_version;
use receivables_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "customers");
    assert_table_exists(&conn, "titles");
    assert_index_exists(&conn, "idx_titles_customer_id");
    assert_index_exists(&conn, "idx_titles_payment_due");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let result = conn.execute(
        "INSERT INTO titles (id, customer_id, amount_cents, issue_date, due_date)
         VALUES ('t-1', 'missing-customer', 100, '2024-01-01', '2024-01-31');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn schema_rejects_reversed_dates_and_paid_without_date() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO customers (id, name) VALUES ('c-1', 'Acme');",
        [],
    )
    .unwrap();

    let reversed = conn.execute(
        "INSERT INTO titles (id, customer_id, amount_cents, issue_date, due_date)
         VALUES ('t-1', 'c-1', 100, '2024-02-01', '2024-01-31');",
        [],
    );
    assert!(reversed.is_err());

    let paid_without_date = conn.execute(
        "INSERT INTO titles (id, customer_id, amount_cents, issue_date, due_date, is_paid)
         VALUES ('t-2', 'c-1', 100, '2024-01-01', '2024-01-31', 1);",
        [],
    );
    assert!(paid_without_date.is_err());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receivables.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute("INSERT INTO customers (id, name) VALUES ('c-1', 'Acme');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM customers;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
