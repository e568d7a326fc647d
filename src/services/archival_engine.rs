//! Archival Engine for GitBrowser.
//!
//! Moves idle tabs out of every live working set into the archive store and
//! permanently deletes archive entries once they outlive the retention window.
//!
//! A declutter pass walks `IDLE -> started -> per-source scans -> settling ->
//! completed -> IDLE`. Per-source scans are posted to the control-thread
//! [`TaskQueue`] and may complete in any order; the pass settles (deletion plus
//! ancestry repair) once the last outstanding source reports back, then every
//! pass observer is told exactly once.
//!
//! Tabs are always inserted into the archive before they are removed from
//! their working set. A crash between the two leaves the tab in both places,
//! which the next pass reconciles by dropping the live copy.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::rc::{Rc, Weak};
use std::thread::{self, ThreadId};

use tracing::{debug, info, warn};

use super::clock::Clock;
use super::duplicate_tracker::DuplicateTracker;
use super::eligibility_policy::{
    days_between, is_archive_entry_eligible_for_deletion, is_group_eligible_for_archive,
    is_tab_eligible_for_archive, GroupEligibilityCache,
};
use super::tab_state::TabStateStore;
use super::task_queue::{EngineTask, TaskQueue};
use crate::managers::archive_store::{freeze, ArchiveStore};
use crate::managers::source_registry::{ObserverId, SourceEvent, SourceId, SourceRegistry};
use crate::managers::tab_manager::TabSource;
use crate::types::archive::PassSummary;
use crate::types::errors::{ArchiveError, TabError};
use crate::types::settings::RetentionSettings;
use crate::types::tab::{InsertPosition, TabId};

/// Reads the current retention settings. Called once per pass and once per
/// direct operation.
pub type SettingsAccessor = Box<dyn Fn() -> RetentionSettings>;

type PassObserver = Box<dyn FnMut(&PassSummary)>;

/// Result of asking for a declutter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A pass was started over `sources` working sets.
    Started { pass_id: u64, sources: usize },
    /// A pass is already running; nothing was changed.
    AlreadyInFlight,
    /// The engine has been destroyed.
    Destroyed,
}

/// State of the single in-flight declutter pass.
struct DeclutterPass {
    id: u64,
    remaining: usize,
    started_at_ms: i64,
    settings: RetentionSettings,
    archive_budget: usize,
    groups: GroupEligibilityCache,
    summary: PassSummary,
}

/// What scanning one working set achieved.
#[derive(Debug, Default)]
struct SourceOutcome {
    archived: usize,
    reconciled: usize,
    cap_reached: bool,
}

/// What one insert-then-remove batch achieved.
#[derive(Debug, Default)]
struct BatchOutcome {
    archived: usize,
    reconciled: usize,
}

/// Orchestrates archival and auto-deletion across all live working sets.
pub struct ArchivalEngine<S: ArchiveStore> {
    registry: Rc<RefCell<SourceRegistry>>,
    archive: S,
    state_store: Box<dyn TabStateStore>,
    settings: SettingsAccessor,
    clock: Box<dyn Clock>,
    tasks: Rc<TaskQueue>,
    observers: Vec<(ObserverId, PassObserver)>,
    registry_observer: Option<ObserverId>,
    awaiting_init: BTreeSet<SourceId>,
    pass: Option<DeclutterPass>,
    next_pass_id: u64,
    last_summary: Option<PassSummary>,
    declutter_initialized: bool,
    destroyed: bool,
    control_thread: ThreadId,
}

impl<S: ArchiveStore> ArchivalEngine<S> {
    /// Creates an engine bound to the calling thread.
    pub fn new(
        registry: Rc<RefCell<SourceRegistry>>,
        archive: S,
        state_store: Box<dyn TabStateStore>,
        settings: SettingsAccessor,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            archive,
            state_store,
            settings,
            clock,
            tasks: Rc::new(TaskQueue::new()),
            observers: Vec::new(),
            registry_observer: None,
            awaiting_init: BTreeSet::new(),
            pass: None,
            next_pass_id: 1,
            last_summary: None,
            declutter_initialized: false,
            destroyed: false,
            control_thread: thread::current().id(),
        }
    }

    /// Subscribes to the source registry so working sets are archived as they
    /// become ready, independent of scheduled passes.
    pub fn init_declutter(&mut self) {
        self.assert_on_control_thread();
        if self.destroyed || self.declutter_initialized {
            return;
        }
        let tasks: Weak<TaskQueue> = Rc::downgrade(&self.tasks);
        let handle = self.registry.borrow_mut().add_observer(move |event| {
            if let Some(tasks) = tasks.upgrade() {
                tasks.post(EngineTask::Source(event));
            }
        });
        self.registry_observer = Some(handle);
        self.declutter_initialized = true;
        debug!("declutter initialized");
    }

    /// Starts a declutter pass over every known working set.
    ///
    /// # Panics
    /// Panics if [`init_declutter`](Self::init_declutter) has not been called.
    pub fn trigger_scheduled_declutter(&mut self) -> TriggerOutcome {
        self.assert_on_control_thread();
        assert!(
            self.declutter_initialized,
            "trigger_scheduled_declutter called before init_declutter"
        );
        if self.destroyed {
            return TriggerOutcome::Destroyed;
        }
        if let Some(pass) = &self.pass {
            debug!(pass_id = pass.id, remaining = pass.remaining, "declutter pass already in flight");
            return TriggerOutcome::AlreadyInFlight;
        }

        let settings = (self.settings)();
        let started_at_ms = self.clock.now_millis();
        let source_ids = self.registry.borrow().source_ids();
        let pass_id = self.next_pass_id;
        self.next_pass_id += 1;

        self.pass = Some(DeclutterPass {
            id: pass_id,
            remaining: source_ids.len(),
            started_at_ms,
            archive_budget: settings.max_simultaneous_archives,
            settings,
            groups: GroupEligibilityCache::new(),
            summary: PassSummary {
                pass_id,
                started_at_ms,
                ..PassSummary::default()
            },
        });
        info!(pass_id, sources = source_ids.len(), "declutter pass started");

        for source in &source_ids {
            self.tasks.post(EngineTask::DeclutterSource {
                pass_id,
                source: *source,
            });
        }
        if source_ids.is_empty() {
            self.settle_pass();
        }

        TriggerOutcome::Started {
            pass_id,
            sources: source_ids.len(),
        }
    }

    /// Drains the control-thread queue, including tasks posted while draining.
    /// Returns the number of tasks executed.
    pub fn run_pending_tasks(&mut self) -> usize {
        self.assert_on_control_thread();
        let mut executed = 0;
        while let Some(task) = self.tasks.pop() {
            executed += 1;
            match task {
                EngineTask::Source(event) => self.on_source_event(event),
                EngineTask::DeclutterSource { pass_id, source } => {
                    self.declutter_pass_source(pass_id, source)
                }
            }
        }
        executed
    }

    /// Permanently deletes archive entries past the deletion threshold.
    /// Returns how many entries were deleted.
    pub fn delete_eligible_archived_tabs(&mut self) -> usize {
        self.assert_on_control_thread();
        let settings = (self.settings)();
        let now_ms = self.clock.now_millis();
        self.delete_expired(&settings, now_ms)
    }

    /// Restores every archived tab into `destination` without refreshing
    /// timestamps. Used when archiving gets switched off.
    pub fn rescue_archived_tabs(&mut self, destination: SourceId) -> Result<usize, ArchiveError> {
        self.assert_on_control_thread();
        let ids: Vec<TabId> = match self.archive.enumerate() {
            Ok(entries) => entries.iter().map(|e| e.id()).collect(),
            Err(err) => {
                warn!(destination = %destination, error = %err, "archive unreadable; nothing rescued");
                return Ok(0);
            }
        };
        let rescued = self.unarchive_and_restore_tabs(destination, &ids, false, false)?;
        info!(destination = %destination, rescued, "rescued archived tabs");
        Ok(rescued)
    }

    /// Archives specific tabs outside of a pass. Returns how many tabs left
    /// the working set.
    pub fn archive_and_remove_tabs(
        &mut self,
        source: SourceId,
        tabs: &[TabId],
    ) -> Result<usize, ArchiveError> {
        self.assert_on_control_thread();
        let now_ms = self.clock.now_millis();
        let registry = Rc::clone(&self.registry);
        let mut registry = registry.borrow_mut();
        let working_set = registry
            .source_mut(source)
            .ok_or(ArchiveError::SourceNotFound(source))?;
        let outcome = archive_batch(
            &mut self.archive,
            self.state_store.as_ref(),
            working_set,
            tabs,
            now_ms,
        );
        info!(source = %source, archived = outcome.archived, reconciled = outcome.reconciled, "archived tabs");
        Ok(outcome.archived + outcome.reconciled)
    }

    /// Recreates archived entries as live tabs in `destination`, then removes
    /// them from the archive in one batch. Returns how many tabs were restored.
    ///
    /// With `update_timestamp` the tabs count as active now, so the next pass
    /// does not archive them again. Restored tabs go to the front of the
    /// working set unless `opening_new_tabs` is set, in which case they are
    /// appended. If the archive cannot drop the entries, the new live copies
    /// are removed again and nothing counts as restored.
    pub fn unarchive_and_restore_tabs(
        &mut self,
        destination: SourceId,
        ids: &[TabId],
        update_timestamp: bool,
        opening_new_tabs: bool,
    ) -> Result<usize, ArchiveError> {
        self.assert_on_control_thread();
        let now_ms = self.clock.now_millis();
        let registry = Rc::clone(&self.registry);
        let mut registry = registry.borrow_mut();
        let working_set = registry
            .source_mut(destination)
            .ok_or(ArchiveError::SourceNotFound(destination))?;
        let position = if opening_new_tabs {
            InsertPosition::End
        } else {
            InsertPosition::Front
        };

        let mut restored = Vec::new();
        let mut inserted = Vec::new();
        for &id in ids {
            let entry = match self.archive.get(id) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(err) => {
                    warn!(tab_id = id, error = %err, "failed to read archive entry");
                    continue;
                }
            };
            let mut tab = freeze(entry.tab);
            if update_timestamp {
                tab.last_active_ms = tab.last_active_ms.max(now_ms);
            }
            match working_set.insert_tab(tab, position) {
                Ok(()) => {
                    inserted.push(id);
                    restored.push(id);
                }
                Err(TabError::AlreadyExists(_)) => {
                    debug!(tab_id = id, "tab already live; dropping archived copy");
                    restored.push(id);
                }
                Err(err) => warn!(tab_id = id, error = %err, "failed to restore archived tab"),
            }
        }

        if !restored.is_empty() {
            if let Err(err) = self.archive.remove_batch(&restored, false) {
                warn!(error = %err, count = restored.len(), "archive removal failed; restore rolled back");
                working_set.remove_tabs(&inserted, false);
                return Ok(0);
            }
        }
        info!(destination = %destination, restored = restored.len(), "restored archived tabs");
        Ok(restored.len())
    }

    /// Clears stale ancestry from archive entries: no parent, root is self.
    /// Returns how many entries were corrected.
    pub fn ensure_archived_tabs_have_correct_fields(&mut self) -> usize {
        self.assert_on_control_thread();
        let entries = match self.archive.enumerate() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "failed to enumerate archive for repair");
                return 0;
            }
        };
        let mut repaired = 0;
        for entry in entries {
            match self.archive.reset_ancestry(entry.id()) {
                Ok(true) => repaired += 1,
                Ok(false) => {}
                Err(err) => warn!(tab_id = entry.id(), error = %err, "failed to repair archive entry"),
            }
        }
        if repaired > 0 {
            debug!(repaired, "repaired archive entry ancestry");
        }
        repaired
    }

    /// Registers a callback run once at the end of every declutter pass.
    pub fn add_observer(&mut self, observer: impl FnMut(&PassSummary) + 'static) -> ObserverId {
        self.assert_on_control_thread();
        let id = ObserverId::new();
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.assert_on_control_thread();
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Deregisters from the source registry, drops observers and pending work.
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        self.assert_on_control_thread();
        if self.destroyed {
            return;
        }
        if let Some(handle) = self.registry_observer.take() {
            match self.registry.try_borrow_mut() {
                Ok(mut registry) => {
                    registry.remove_observer(handle);
                }
                Err(_) => warn!("source registry busy; observer left registered"),
            }
        }
        self.observers.clear();
        self.tasks.clear();
        self.awaiting_init.clear();
        self.pass = None;
        self.destroyed = true;
        debug!("archival engine destroyed");
    }

    pub fn is_pass_in_flight(&self) -> bool {
        self.pass.is_some()
    }

    /// Number of working sets the in-flight pass is still waiting on.
    pub fn outstanding_sources(&self) -> Option<usize> {
        self.pass.as_ref().map(|pass| pass.remaining)
    }

    pub fn last_pass_summary(&self) -> Option<&PassSummary> {
        self.last_summary.as_ref()
    }

    pub fn pending_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Read-only view of the archive store.
    pub fn archive(&self) -> &S {
        &self.archive
    }

    pub fn registry(&self) -> &Rc<RefCell<SourceRegistry>> {
        &self.registry
    }

    // Private functions.

    fn assert_on_control_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.control_thread,
            "ArchivalEngine used off its control thread"
        );
    }

    fn on_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Added(source) => {
                if (self.settings)().archive_enabled {
                    self.awaiting_init.insert(source);
                }
            }
            SourceEvent::Initialized(source) => {
                if !self.awaiting_init.remove(&source) {
                    return;
                }
                let settings = (self.settings)();
                if !settings.archive_enabled {
                    return;
                }
                let now_ms = self.clock.now_millis();
                let mut groups = GroupEligibilityCache::new();
                if let Some(outcome) = self.declutter_source(
                    source,
                    &settings,
                    now_ms,
                    settings.max_simultaneous_archives,
                    &mut groups,
                ) {
                    debug!(
                        source = %source,
                        archived = outcome.archived,
                        reconciled = outcome.reconciled,
                        "archived tabs from newly ready source"
                    );
                }
            }
            SourceEvent::Removed(source) => {
                self.awaiting_init.remove(&source);
            }
        }
    }

    fn declutter_pass_source(&mut self, pass_id: u64, source: SourceId) {
        let Some(mut pass) = self.pass.take() else {
            debug!(pass_id, source = %source, "dropping scan for finished pass");
            return;
        };
        if pass.id != pass_id {
            debug!(pass_id, source = %source, "dropping scan for stale pass");
            self.pass = Some(pass);
            return;
        }

        let ready = self
            .registry
            .borrow()
            .source(source)
            .map(|s| s.is_initialized());
        let outcome = match ready {
            _ if !pass.settings.archive_enabled => None,
            Some(true) => self.declutter_source(
                source,
                &pass.settings,
                pass.started_at_ms,
                pass.archive_budget,
                &mut pass.groups,
            ),
            Some(false) => {
                // Picked up lazily once the working set reports ready.
                self.awaiting_init.insert(source);
                None
            }
            None => None,
        };

        match outcome {
            Some(outcome) => {
                pass.archive_budget = pass.archive_budget.saturating_sub(outcome.archived);
                pass.summary.sources_processed += 1;
                pass.summary.tabs_archived += outcome.archived;
                pass.summary.duplicates_reconciled += outcome.reconciled;
                pass.summary.cap_reached |= outcome.cap_reached;
            }
            None => {
                debug!(pass_id, source = %source, "source skipped for this pass");
                pass.summary.sources_skipped += 1;
            }
        }

        pass.remaining = pass.remaining.saturating_sub(1);
        let done = pass.remaining == 0;
        self.pass = Some(pass);
        if done {
            self.settle_pass();
        }
    }

    /// Runs deletion and ancestry repair for the finished pass, then notifies
    /// observers and returns to idle.
    fn settle_pass(&mut self) {
        let Some(pass) = self.pass.take() else {
            return;
        };
        let mut summary = pass.summary;
        summary.entries_deleted = self.delete_expired(&pass.settings, pass.started_at_ms);
        summary.entries_repaired = self.ensure_archived_tabs_have_correct_fields();
        summary.finished_at_ms = self.clock.now_millis();

        info!(
            pass_id = summary.pass_id,
            archived = summary.tabs_archived,
            reconciled = summary.duplicates_reconciled,
            deleted = summary.entries_deleted,
            skipped = summary.sources_skipped,
            "declutter pass completed"
        );

        for (_, observer) in self.observers.iter_mut() {
            observer(&summary);
        }
        self.last_summary = Some(summary);
    }

    fn delete_expired(&mut self, settings: &RetentionSettings, now_ms: i64) -> usize {
        if !settings.auto_delete_enabled {
            return 0;
        }
        let entries = match self.archive.enumerate() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "failed to enumerate archive for deletion");
                return 0;
            }
        };
        let expired: Vec<TabId> = entries
            .iter()
            .filter(|entry| is_archive_entry_eligible_for_deletion(entry, now_ms, settings))
            .inspect(|entry| {
                debug!(
                    tab_id = entry.id(),
                    age_days = days_between(entry.archived_at_ms, now_ms),
                    "archived tab eligible for deletion"
                )
            })
            .map(|entry| entry.id())
            .collect();
        if expired.is_empty() {
            return 0;
        }
        match self.archive.remove_batch(&expired, false) {
            Ok(removed) => {
                info!(deleted = removed.len(), "auto-deleted archived tabs");
                removed.len()
            }
            Err(err) => {
                warn!(error = %err, "auto-deletion failed; entries kept for next pass");
                0
            }
        }
    }

    /// Scans one initialized working set and moves its eligible tabs into the
    /// archive. Returns `None` if the source is unknown.
    fn declutter_source(
        &mut self,
        source: SourceId,
        settings: &RetentionSettings,
        now_ms: i64,
        budget: usize,
        groups: &mut GroupEligibilityCache,
    ) -> Option<SourceOutcome> {
        let registry = Rc::clone(&self.registry);
        let mut registry = registry.borrow_mut();
        let working_set = registry.source_mut(source)?;

        let mut outcome = SourceOutcome::default();
        let (to_close, to_archive) = {
            let view: &dyn TabSource = working_set;
            let duplicates = if settings.archive_duplicate_tabs {
                DuplicateTracker::from_source(view)
            } else {
                DuplicateTracker::new()
            };
            let active = view.current_active_tab_id();

            let mut already_archived = HashSet::new();
            let mut unknown = HashSet::new();
            for tab in (0..view.count()).filter_map(|i| view.tab_at(i)) {
                match self.archive.contains(tab.id) {
                    Ok(true) => {
                        already_archived.insert(tab.id);
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(tab_id = tab.id, error = %err, "archive lookup failed; leaving tab");
                        unknown.insert(tab.id);
                    }
                }
            }

            let mut to_close: Vec<TabId> = Vec::new();
            let mut to_archive: Vec<TabId> = Vec::new();
            let mut visited_groups = HashSet::new();
            for tab in (0..view.count()).filter_map(|i| view.tab_at(i)) {
                if to_archive.len() >= budget {
                    outcome.cap_reached = true;
                    debug!(source = %source, limit = budget, "archive limit reached for this pass");
                    break;
                }
                if unknown.contains(&tab.id) {
                    continue;
                }
                if already_archived.contains(&tab.id) {
                    to_close.push(tab.id);
                    continue;
                }
                if active == Some(tab.id) {
                    continue;
                }

                match &tab.group_id {
                    None => {
                        if is_tab_eligible_for_archive(tab, now_ms, settings, &duplicates) {
                            to_archive.push(tab.id);
                        }
                    }
                    Some(group) => {
                        if !settings.archive_tab_groups || visited_groups.contains(group) {
                            continue;
                        }
                        let related = view.related_tabs(group);
                        let eligible = groups.get_or_compute(group, || {
                            is_group_eligible_for_archive(&related, now_ms, settings, &duplicates)
                        });
                        if !eligible || related.iter().any(|t| active == Some(t.id)) {
                            continue;
                        }
                        let members: Vec<TabId> = related
                            .iter()
                            .map(|t| t.id)
                            .filter(|id| !already_archived.contains(id) && !unknown.contains(id))
                            .collect();
                        visited_groups.insert(group.clone());
                        if to_archive.len() + members.len() > budget {
                            outcome.cap_reached = true;
                            debug!(source = %source, group = %group, "group does not fit the archive limit; deferred");
                            continue;
                        }
                        to_archive.extend(members);
                    }
                }
            }
            (to_close, to_archive)
        };

        if !to_close.is_empty() {
            let removed = working_set.remove_tabs(&to_close, false);
            debug!(source = %source, count = removed.len(), "removed live tabs that were already archived");
            outcome.reconciled += removed.len();
        }
        if !to_archive.is_empty() {
            let batch = archive_batch(
                &mut self.archive,
                self.state_store.as_ref(),
                working_set,
                &to_archive,
                now_ms,
            );
            outcome.archived += batch.archived;
            outcome.reconciled += batch.reconciled;
        }
        debug!(
            source = %source,
            archived = outcome.archived,
            reconciled = outcome.reconciled,
            "source decluttered"
        );
        Some(outcome)
    }
}

impl<S: ArchiveStore> Drop for ArchivalEngine<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Inserts each tab into the archive, then removes every tab that made it
/// from the working set in one bulk removal. Tabs with no restorable state or
/// whose insert fails stay where they are.
fn archive_batch<S: ArchiveStore>(
    archive: &mut S,
    state_store: &dyn TabStateStore,
    working_set: &mut dyn TabSource,
    ids: &[TabId],
    now_ms: i64,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut moved = Vec::with_capacity(ids.len());
    for &id in ids {
        let Some(tab) = working_set.tab_by_id(id) else {
            continue;
        };
        let Some(state) = state_store.extract_state(tab) else {
            debug!(tab_id = id, "no restorable state; tab stays live");
            continue;
        };
        match archive.insert(state.into_frozen_tab(), now_ms) {
            Ok(()) => {
                outcome.archived += 1;
                moved.push(id);
            }
            Err(ArchiveError::DuplicateId(_)) => {
                debug!(tab_id = id, "tab already archived; removing live copy only");
                outcome.reconciled += 1;
                moved.push(id);
            }
            Err(err) => warn!(tab_id = id, error = %err, "failed to archive tab"),
        }
    }
    if !moved.is_empty() {
        working_set.remove_tabs(&moved, false);
    }
    outcome
}
