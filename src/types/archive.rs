use serde::{Deserialize, Serialize};

use super::tab::{Tab, TabId};

/// A tab held in the archive store, stamped with the time it was archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub tab: Tab,
    pub archived_at_ms: i64,
}

impl ArchiveEntry {
    /// Wraps a frozen tab. The archived time never precedes the tab's own activity.
    pub fn new(tab: Tab, now_ms: i64) -> Self {
        let archived_at_ms = now_ms.max(tab.last_active_ms);
        Self {
            tab,
            archived_at_ms,
        }
    }

    pub fn id(&self) -> TabId {
        self.tab.id
    }
}

/// Aggregate outcome of one declutter pass, handed to pass observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub pass_id: u64,
    pub started_at_ms: i64,
    pub finished_at_ms: i64,
    pub sources_processed: usize,
    pub sources_skipped: usize,
    pub tabs_archived: usize,
    pub duplicates_reconciled: usize,
    pub entries_deleted: usize,
    pub entries_repaired: usize,
    pub cap_reached: bool,
}
