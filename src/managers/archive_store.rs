//! Archive Store for GitBrowser.
//!
//! The separate tab collection holding archived (dormant) tabs. Entries keep
//! the original tab id, so an archived tab can be matched against its live
//! counterpart and restored under the same identity.

use tracing::debug;

use crate::types::archive::ArchiveEntry;
use crate::types::errors::ArchiveError;
use crate::types::tab::{Tab, TabId};

/// Trait defining the archive store interface consumed by the archiver.
pub trait ArchiveStore {
    /// Snapshot of every entry in archive order.
    fn enumerate(&self) -> Result<Vec<ArchiveEntry>, ArchiveError>;
    fn get(&self, id: TabId) -> Result<Option<ArchiveEntry>, ArchiveError>;
    fn count(&self) -> Result<usize, ArchiveError>;
    /// Adds a frozen copy of `tab`. Fails with [`ArchiveError::DuplicateId`]
    /// when an entry with the same id already exists.
    fn insert(&mut self, tab: Tab, archived_at_ms: i64) -> Result<(), ArchiveError>;
    /// Removes the given entries in one operation and returns what was removed.
    /// Unknown ids are ignored.
    fn remove_batch(
        &mut self,
        ids: &[TabId],
        allow_undo: bool,
    ) -> Result<Vec<ArchiveEntry>, ArchiveError>;
    /// Clears the parent and points the root at the entry itself.
    /// Returns true if the entry had to be changed.
    fn reset_ancestry(&mut self, id: TabId) -> Result<bool, ArchiveError>;

    fn contains(&self, id: TabId) -> Result<bool, ArchiveError> {
        Ok(self.get(id)?.is_some())
    }
}

/// Strips ancestry from a tab entering the archive.
pub(crate) fn freeze(mut tab: Tab) -> Tab {
    tab.parent_id = None;
    tab.root_id = tab.id;
    tab
}

/// Archive store kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryArchiveStore {
    entries: Vec<ArchiveEntry>,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with entries as-is, without freezing them.
    pub fn with_entries(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries }
    }
}

impl ArchiveStore for InMemoryArchiveStore {
    fn enumerate(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        Ok(self.entries.clone())
    }

    fn get(&self, id: TabId) -> Result<Option<ArchiveEntry>, ArchiveError> {
        Ok(self.entries.iter().find(|e| e.id() == id).cloned())
    }

    fn count(&self) -> Result<usize, ArchiveError> {
        Ok(self.entries.len())
    }

    fn insert(&mut self, tab: Tab, archived_at_ms: i64) -> Result<(), ArchiveError> {
        if self.entries.iter().any(|e| e.id() == tab.id) {
            return Err(ArchiveError::DuplicateId(tab.id));
        }
        self.entries
            .push(ArchiveEntry::new(freeze(tab), archived_at_ms));
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
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| ids.contains(&e.id()));
        self.entries = kept;
        Ok(removed)
    }

    fn reset_ancestry(&mut self, id: TabId) -> Result<bool, ArchiveError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(ArchiveError::EntryNotFound(id))?;
        if entry.tab.parent_id.is_none() && entry.tab.root_id == id {
            return Ok(false);
        }
        entry.tab.parent_id = None;
        entry.tab.root_id = id;
        Ok(true)
    }
}
