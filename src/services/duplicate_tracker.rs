// GitBrowser Duplicate Tracker
// Maps each normalized URL in a working set to the most recent activity among
// its ungrouped tabs. Grouped tabs never take part in duplicate detection.

use std::collections::HashMap;

use crate::managers::tab_manager::TabSource;
use crate::types::tab::Tab;

/// Per-pass map from normalized URL to the freshest last-active timestamp.
#[derive(Debug, Clone, Default)]
pub struct DuplicateTracker {
    latest: HashMap<String, i64>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map in a single pass over `tabs`.
    pub fn build<'a>(tabs: impl IntoIterator<Item = &'a Tab>) -> Self {
        let mut tracker = Self::new();
        for tab in tabs {
            tracker.record(tab);
        }
        tracker
    }

    /// Builds the map from every tab in a working set.
    pub fn from_source(source: &dyn TabSource) -> Self {
        Self::build((0..source.count()).filter_map(|i| source.tab_at(i)))
    }

    pub fn record(&mut self, tab: &Tab) {
        if tab.is_grouped() {
            return;
        }
        self.latest
            .entry(tab.normalized_url())
            .and_modify(|ts| *ts = (*ts).max(tab.last_active_ms))
            .or_insert(tab.last_active_ms);
    }

    pub fn latest_for(&self, normalized_url: &str) -> Option<i64> {
        self.latest.get(normalized_url).copied()
    }

    /// True if a strictly fresher ungrouped tab with the same URL exists.
    pub fn has_fresher_copy(&self, tab: &Tab) -> bool {
        if tab.is_grouped() {
            return false;
        }
        self.latest_for(&tab.normalized_url())
            .is_some_and(|latest| latest > tab.last_active_ms)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
