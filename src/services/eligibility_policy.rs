//! Eligibility Policy for tab archiving.
//!
//! Pure decisions: given a tab (or archive entry), the pass's clock sample and a
//! settings snapshot, should it move to the archive, or out of it for good?
//! Nothing here touches a working set or the archive store.

use std::collections::HashMap;

use super::duplicate_tracker::DuplicateTracker;
use crate::types::archive::ArchiveEntry;
use crate::types::settings::RetentionSettings;
use crate::types::tab::{GroupId, Tab, INVALID_TIMESTAMP};

pub const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Whole hours elapsed from `from_ms` to `now_ms`, truncated toward zero.
/// `None` when `from_ms` is unknown or the span does not fit in an `i64`.
pub fn hours_between(from_ms: i64, now_ms: i64) -> Option<i64> {
    if from_ms == INVALID_TIMESTAMP {
        return None;
    }
    now_ms.checked_sub(from_ms).map(|span| span / MILLIS_PER_HOUR)
}

/// Whole days elapsed, used only for log fields.
pub fn days_between(from_ms: i64, now_ms: i64) -> Option<i64> {
    if from_ms == INVALID_TIMESTAMP {
        return None;
    }
    now_ms.checked_sub(from_ms).map(|span| span / MILLIS_PER_DAY)
}

/// True if at least `threshold_hours` have passed since `timestamp_ms`.
/// An unknown timestamp is never old enough.
pub fn is_older_than(timestamp_ms: i64, now_ms: i64, threshold_hours: i64) -> bool {
    hours_between(timestamp_ms, now_ms).is_some_and(|age| age >= threshold_hours)
}

/// Decides whether a single live tab should be archived.
///
/// The tab qualifies when it has been inactive for the archive threshold, or,
/// with duplicate archival on, when a fresher ungrouped copy of its URL exists
/// in the same working set. Tabs without restorable state or without a known
/// last-active time never qualify.
pub fn is_tab_eligible_for_archive(
    tab: &Tab,
    now_ms: i64,
    settings: &RetentionSettings,
    duplicates: &DuplicateTracker,
) -> bool {
    if !tab.has_restorable_state() || tab.last_active_ms == INVALID_TIMESTAMP {
        return false;
    }
    let timestamp_eligible =
        is_older_than(tab.last_active_ms, now_ms, settings.archive_age_threshold_hours);
    let duplicate_eligible = settings.archive_duplicate_tabs && duplicates.has_fresher_copy(tab);
    timestamp_eligible || duplicate_eligible
}

/// A group is archived only when every one of its tabs qualifies on its own.
pub fn is_group_eligible_for_archive(
    related_tabs: &[&Tab],
    now_ms: i64,
    settings: &RetentionSettings,
    duplicates: &DuplicateTracker,
) -> bool {
    !related_tabs.is_empty()
        && related_tabs
            .iter()
            .all(|tab| is_tab_eligible_for_archive(tab, now_ms, settings, duplicates))
}

/// Decides whether an archive entry has outlived the deletion threshold.
pub fn is_archive_entry_eligible_for_deletion(
    entry: &ArchiveEntry,
    now_ms: i64,
    settings: &RetentionSettings,
) -> bool {
    settings.auto_delete_enabled
        && entry.tab.has_restorable_state()
        && is_older_than(entry.archived_at_ms, now_ms, settings.delete_age_threshold_hours)
}

/// Memoized group decisions for one declutter pass.
#[derive(Debug, Default)]
pub struct GroupEligibilityCache {
    decisions: HashMap<GroupId, bool>,
}

impl GroupEligibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached decision for `group`, computing it on first use.
    pub fn get_or_compute(&mut self, group: &GroupId, compute: impl FnOnce() -> bool) -> bool {
        if let Some(decision) = self.decisions.get(group) {
            return *decision;
        }
        let decision = compute();
        self.decisions.insert(group.clone(), decision);
        decision
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}
