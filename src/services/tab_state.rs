//! Tab state extraction.
//!
//! The archiver never serializes tabs itself; it asks a [`TabStateStore`] for
//! the restorable state of a tab and refuses to archive tabs that have none.

use crate::types::tab::{Tab, TabState};

/// Trait defining how restorable state is pulled out of a live tab.
pub trait TabStateStore {
    /// Returns `None` when the tab has no state that could bring it back.
    fn extract_state(&self, tab: &Tab) -> Option<TabState>;
}

/// State store that reads the serialized blob the tab already carries.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlobStateStore;

impl TabStateStore for BlobStateStore {
    fn extract_state(&self, tab: &Tab) -> Option<TabState> {
        if !tab.has_restorable_state() {
            return None;
        }
        Some(TabState {
            id: tab.id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            last_active_ms: tab.last_active_ms,
            group_id: tab.group_id.clone(),
            parent_id: tab.parent_id,
            root_id: tab.root_id,
            contents: tab.state.clone().unwrap_or_default(),
        })
    }
}
