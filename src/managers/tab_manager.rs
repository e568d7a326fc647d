use crate::types::errors::TabError;
use crate::types::tab::{GroupId, InsertPosition, Tab, TabId};

/// Trait defining a live working set of tabs (one per browser window).
///
/// The archiver only talks to working sets through this interface.
pub trait TabSource {
    /// Whether the working set finished restoring its tabs and may be scanned.
    fn is_initialized(&self) -> bool;
    fn mark_initialized(&mut self);
    fn count(&self) -> usize;
    fn tab_at(&self, index: usize) -> Option<&Tab>;
    fn tab_by_id(&self, id: TabId) -> Option<&Tab>;
    fn current_active_tab_id(&self) -> Option<TabId>;
    /// Makes `tab_id` the active tab and records activity at `now_ms`.
    fn switch_tab(&mut self, tab_id: TabId, now_ms: i64) -> Result<(), TabError>;
    /// Every tab belonging to `group`, in working-set order.
    fn related_tabs(&self, group: &GroupId) -> Vec<&Tab>;
    /// Removes the given tabs in one bulk operation and returns what was removed.
    fn remove_tabs(&mut self, ids: &[TabId], allow_undo: bool) -> Vec<Tab>;
    fn insert_tab(&mut self, tab: Tab, position: InsertPosition) -> Result<(), TabError>;
}

/// One bulk removal kept around so it can be undone.
#[derive(Debug)]
struct RemovalRecord {
    /// Removed tabs with the index each occupied before removal, ascending.
    tabs: Vec<(usize, Tab)>,
    active_tab_id: Option<TabId>,
}

/// In-memory working set for one browser window.
#[derive(Debug, Default)]
pub struct TabManager {
    tabs: Vec<Tab>,
    active_tab_id: Option<TabId>,
    initialized: bool,
    undo_stack: Vec<RemovalRecord>,
}

impl TabManager {
    /// Creates an empty working set that still has to restore its tabs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an initialized working set holding `tabs` in order.
    pub fn with_tabs(tabs: Vec<Tab>) -> Self {
        Self {
            tabs,
            initialized: true,
            ..Self::default()
        }
    }

    /// Appends a tab. The first tab of an empty working set becomes active.
    pub fn add_tab(&mut self, tab: Tab) -> Result<(), TabError> {
        self.insert_tab(tab, InsertPosition::End)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }

    /// Puts back the tabs removed by the most recent undoable removal.
    /// Returns how many tabs were restored.
    pub fn undo_last_removal(&mut self) -> usize {
        let Some(record) = self.undo_stack.pop() else {
            return 0;
        };
        let mut restored = 0;
        for (index, tab) in record.tabs {
            if self.find_tab_index(tab.id).is_some() {
                continue;
            }
            let index = index.min(self.tabs.len());
            self.tabs.insert(index, tab);
            restored += 1;
        }
        if let Some(active) = record.active_tab_id {
            if self.find_tab_index(active).is_some() {
                self.active_tab_id = Some(active);
            }
        }
        restored
    }

    fn find_tab_index(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }
}

impl TabSource for TabManager {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    fn count(&self) -> usize {
        self.tabs.len()
    }

    fn tab_at(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    fn tab_by_id(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    fn current_active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    /// Last-active timestamps only move forward.
    fn switch_tab(&mut self, tab_id: TabId, now_ms: i64) -> Result<(), TabError> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or(TabError::NotFound(tab_id))?;
        tab.last_active_ms = tab.last_active_ms.max(now_ms);
        self.active_tab_id = Some(tab_id);
        Ok(())
    }

    fn related_tabs(&self, group: &GroupId) -> Vec<&Tab> {
        self.tabs
            .iter()
            .filter(|t| t.group_id.as_ref() == Some(group))
            .collect()
    }

    /// Removes the tabs in one sweep. If the active tab goes away, the nearest
    /// surviving neighbor becomes active.
    fn remove_tabs(&mut self, ids: &[TabId], allow_undo: bool) -> Vec<Tab> {
        let previous_active = self.active_tab_id;
        let active_index = previous_active.and_then(|id| self.find_tab_index(id));

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.tabs.len());
        for (index, tab) in self.tabs.drain(..).enumerate() {
            if ids.contains(&tab.id) {
                removed.push((index, tab));
            } else {
                kept.push(tab);
            }
        }
        self.tabs = kept;

        if previous_active.is_some_and(|id| removed.iter().any(|(_, t)| t.id == id)) {
            let removed_before = active_index
                .map(|a| removed.iter().filter(|(i, _)| *i < a).count())
                .unwrap_or(0);
            let neighbor = active_index
                .map(|a| (a - removed_before).min(self.tabs.len().saturating_sub(1)));
            self.active_tab_id = neighbor.and_then(|i| self.tabs.get(i)).map(|t| t.id);
        }

        if allow_undo && !removed.is_empty() {
            self.undo_stack.push(RemovalRecord {
                tabs: removed.iter().map(|(i, t)| (*i, t.clone())).collect(),
                active_tab_id: previous_active,
            });
        }

        removed.into_iter().map(|(_, tab)| tab).collect()
    }

    fn insert_tab(&mut self, tab: Tab, position: InsertPosition) -> Result<(), TabError> {
        if self.find_tab_index(tab.id).is_some() {
            return Err(TabError::AlreadyExists(tab.id));
        }
        let id = tab.id;
        match position {
            InsertPosition::Front => self.tabs.insert(0, tab),
            InsertPosition::End => self.tabs.push(tab),
        }
        if self.active_tab_id.is_none() {
            self.active_tab_id = Some(id);
        }
        Ok(())
    }
}
