//! SQLite-backed archive store.
//!
//! Keeps archived tabs across restarts. Every bulk operation runs inside one
//! transaction so a batch either lands completely or not at all.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::archive_store::{freeze, ArchiveStore};
use crate::database::connection::Database;
use crate::types::archive::ArchiveEntry;
use crate::types::errors::ArchiveError;
use crate::types::tab::{GroupId, Tab, TabId};

const SELECT_COLUMNS: &str = "id, url, title, last_active_ms, group_id, parent_id, root_id, state, archived_at_ms";

/// Archive store persisted in the archive database.
pub struct SqliteArchiveStore {
    db: Database,
}

impl SqliteArchiveStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ArchiveEntry> {
        let group_id: Option<String> = row.get(4)?;
        Ok(ArchiveEntry {
            tab: Tab {
                id: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                last_active_ms: row.get(3)?,
                group_id: group_id.map(GroupId),
                parent_id: row.get(5)?,
                root_id: row.get(6)?,
                state: row.get(7)?,
            },
            archived_at_ms: row.get(8)?,
        })
    }
}

impl ArchiveStore for SqliteArchiveStore {
    fn enumerate(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM archived_tabs ORDER BY seq ASC"
        ))?;
        let rows = stmt.query_map([], Self::entry_from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn get(&self, id: TabId) -> Result<Option<ArchiveEntry>, ArchiveError> {
        let entry = self
            .db
            .connection()
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM archived_tabs WHERE id = ?1"),
                params![id],
                Self::entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn count(&self) -> Result<usize, ArchiveError> {
        let count: i64 = self
            .db
            .connection()
            .query_row("SELECT COUNT(*) FROM archived_tabs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert(&mut self, tab: Tab, archived_at_ms: i64) -> Result<(), ArchiveError> {
        if self.contains(tab.id)? {
            return Err(ArchiveError::DuplicateId(tab.id));
        }
        let entry = ArchiveEntry::new(freeze(tab), archived_at_ms);
        let tab = &entry.tab;
        self.db.connection().execute(
            "INSERT INTO archived_tabs
                (id, seq, url, title, last_active_ms, group_id, parent_id, root_id, state, archived_at_ms)
             VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM archived_tabs), ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tab.id,
                tab.url,
                tab.title,
                tab.last_active_ms,
                tab.group_id.as_ref().map(|g| g.0.as_str()),
                tab.parent_id,
                tab.root_id,
                tab.state,
                entry.archived_at_ms,
            ],
        )?;
        Ok(())
    }

    fn remove_batch(
        &mut self,
        ids: &[TabId],
        allow_undo: bool,
    ) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        if allow_undo {
            debug!(count = ids.len(), "archive removal is never undoable; ignoring allow_undo");
        }
        let tx = self.db.connection_mut().transaction()?;
        let mut removed = Vec::new();
        {
            let mut select = tx.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM archived_tabs WHERE id = ?1"
            ))?;
            let mut delete = tx.prepare("DELETE FROM archived_tabs WHERE id = ?1")?;
            for id in ids {
                if let Some(entry) = select
                    .query_row(params![id], Self::entry_from_row)
                    .optional()?
                {
                    delete.execute(params![id])?;
                    removed.push(entry);
                }
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn reset_ancestry(&mut self, id: TabId) -> Result<bool, ArchiveError> {
        let Some(entry) = self.get(id)? else {
            return Err(ArchiveError::EntryNotFound(id));
        };
        if entry.tab.parent_id.is_none() && entry.tab.root_id == id {
            return Ok(false);
        }
        self.db.connection().execute(
            "UPDATE archived_tabs SET parent_id = NULL, root_id = id WHERE id = ?1",
            params![id],
        )?;
        Ok(true)
    }
}
