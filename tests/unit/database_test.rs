//! Unit tests for the archive database layer (connection + migrations).

use gitbrowser_archive::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use gitbrowser_archive::database::Database;
use gitbrowser_archive::managers::archive_store::ArchiveStore;
use gitbrowser_archive::managers::sqlite_archive_store::SqliteArchiveStore;
use gitbrowser_archive::types::tab::{GroupId, Tab};
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_archive_table_and_index() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    for (kind, name) in [("table", "archived_tabs"), ("index", "idx_archived_tabs_archived_at")] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
                [kind, name],
                |row| row.get(0),
            )
            .unwrap_or(false);
        assert!(exists, "{} '{}' should exist after migrations", kind, name);
    }
    assert_eq!(get_schema_version(conn), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let result = run_all(db.connection());
    assert!(result.is_ok(), "Running migrations twice should succeed (idempotent)");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_archive_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("archive.db");

    {
        let mut store = SqliteArchiveStore::new(Database::open(&db_path).unwrap());
        let tab = Tab::new(11, "https://kept.test", 1_000)
            .with_group(GroupId::new("g"))
            .with_state(vec![1, 2, 3]);
        store.insert(tab, 2_000).unwrap();
    }
    assert!(db_path.exists(), "Database file should exist on disk");

    let store = SqliteArchiveStore::new(Database::open(&db_path).unwrap());
    let entry = store.get(11).unwrap().expect("entry should survive reopen");
    assert_eq!(entry.tab.url, "https://kept.test");
    assert_eq!(entry.tab.group_id, Some(GroupId::new("g")));
    assert_eq!(entry.tab.state, Some(vec![1, 2, 3]));
    assert_eq!(entry.archived_at_ms, 2_000);
}
