use notebooks_core::db::migrations::latest_version;
use notebooks_core::db::{open_db, open_db_in_memory, remove_store_files, DbError, DEFAULT_BUSY_TIMEOUT};
use notebooks_core::{DataController, StoreConfig};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "notebooks");
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "photographs");
}

#[test]
fn opening_same_store_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Notebooks.sqlite");

    let first = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    let second = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    assert_eq!(schema_version(&second), latest_version());
}

#[test]
fn file_store_uses_wal_and_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("Notebooks.sqlite"), DEFAULT_BUSY_TIMEOUT).unwrap();

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");
    assert_eq!(foreign_keys, 1);
}

#[test]
fn second_cover_for_same_notebook_is_rejected_by_schema() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO notebooks (id, title, created_at) VALUES ('nb', 'notebook1', 0);
         INSERT INTO photographs (id, image_data, created_at, notebook_id)
         VALUES ('p1', x'01', 0, 'nb');",
    )
    .unwrap();

    let second = conn.execute(
        "INSERT INTO photographs (id, image_data, created_at, notebook_id)
         VALUES ('p2', x'02', 0, 'nb');",
        [],
    );
    assert!(second.is_err());
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Notebooks.sqlite");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
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

    let config = StoreConfig::new("Notebooks", dir.path()).unwrap();
    assert!(matches!(
        DataController::load(config),
        Err(DbError::UnsupportedSchemaVersion { .. })
    ));
}

#[test]
fn removing_missing_store_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sqlite");

    match remove_store_files(&path) {
        Err(DbError::StoreNotFound(reported)) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
