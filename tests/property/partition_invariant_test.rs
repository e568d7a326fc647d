//! Property-based tests for the archive partition invariant.
//!
//! For arbitrary windows, settings and restore choices, every tab must live in
//! exactly one place: some window's working set or the archive store. Passes
//! may move tabs but never lose or duplicate them.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use gitbrowser_archive::managers::archive_store::{ArchiveStore, InMemoryArchiveStore};
use gitbrowser_archive::managers::source_registry::{SourceId, SourceRegistry};
use gitbrowser_archive::managers::tab_manager::{TabManager, TabSource};
use gitbrowser_archive::services::archival_engine::ArchivalEngine;
use gitbrowser_archive::services::tab_state::BlobStateStore;
use gitbrowser_archive::types::settings::RetentionSettings;
use gitbrowser_archive::types::tab::{GroupId, Tab, TabId};
use proptest::prelude::*;

const HOUR: i64 = 60 * 60 * 1000;
const NOW: i64 = 100_000 * HOUR;
const WINDOWS: usize = 3;

#[derive(Debug, Clone)]
struct TabShape {
    window: usize,
    idle_hours: i64,
    url: usize,
    group: Option<usize>,
    has_state: bool,
}

fn arb_tab_shape() -> impl Strategy<Value = TabShape> {
    (
        0..WINDOWS,
        0..1_000i64,
        0..4usize,
        prop::option::weighted(0.3, 0..3usize),
        prop::bool::weighted(0.9),
    )
        .prop_map(|(window, idle_hours, url, group, has_state)| TabShape {
            window,
            idle_hours,
            url,
            group,
            has_state,
        })
}

fn arb_settings() -> impl Strategy<Value = RetentionSettings> {
    (1..800i64, any::<bool>(), any::<bool>(), 1..30usize).prop_map(
        |(threshold, duplicates, groups, cap)| RetentionSettings {
            archive_enabled: true,
            auto_delete_enabled: false,
            archive_age_threshold_hours: threshold,
            archive_duplicate_tabs: duplicates,
            archive_tab_groups: groups,
            max_simultaneous_archives: cap,
            ..RetentionSettings::default()
        },
    )
}

fn build_tab(id: TabId, shape: &TabShape) -> Tab {
    let mut tab = Tab::new(id, format!("https://site{}.test/", shape.url), NOW - shape.idle_hours * HOUR);
    if let Some(group) = shape.group {
        // Groups are scoped to a window.
        tab = tab.with_group(GroupId::new(format!("w{}-g{}", shape.window, group)));
    }
    if shape.has_state {
        tab = tab.with_state(vec![shape.url as u8 + 1]);
    }
    tab
}

fn live_ids(registry: &Rc<RefCell<SourceRegistry>>, windows: &[SourceId]) -> Vec<TabId> {
    let registry = registry.borrow();
    windows
        .iter()
        .flat_map(|id| {
            let window = registry.source(*id).unwrap();
            (0..window.count())
                .filter_map(|i| window.tab_at(i))
                .map(|t| t.id)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn assert_partition(
    expected: &BTreeSet<TabId>,
    live: &[TabId],
    archived: &[TabId],
) -> Result<(), TestCaseError> {
    let live_set: BTreeSet<TabId> = live.iter().copied().collect();
    let archived_set: BTreeSet<TabId> = archived.iter().copied().collect();
    prop_assert_eq!(live_set.len(), live.len(), "a tab is live twice");
    prop_assert_eq!(archived_set.len(), archived.len(), "a tab is archived twice");
    prop_assert!(live_set.is_disjoint(&archived_set), "a tab is both live and archived");
    let union: BTreeSet<TabId> = live_set.union(&archived_set).copied().collect();
    prop_assert_eq!(&union, expected, "a tab went missing");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_pass_and_restore_preserve_partition(
        shapes in prop::collection::vec(arb_tab_shape(), 1..40),
        settings in arb_settings(),
        restore_mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        let registry = Rc::new(RefCell::new(SourceRegistry::new()));
        let mut per_window: Vec<Vec<Tab>> = vec![Vec::new(); WINDOWS];
        for (i, shape) in shapes.iter().enumerate() {
            per_window[shape.window].push(build_tab(i as TabId + 1, shape));
        }
        let windows: Vec<SourceId> = per_window
            .into_iter()
            .map(|tabs| registry.borrow_mut().add_source(Box::new(TabManager::with_tabs(tabs))))
            .collect();
        let expected: BTreeSet<TabId> = (1..=shapes.len() as TabId).collect();

        let cap = settings.max_simultaneous_archives;
        let snapshot = settings.clone();
        let mut engine = ArchivalEngine::new(
            Rc::clone(&registry),
            InMemoryArchiveStore::new(),
            Box::new(BlobStateStore),
            Box::new(move || snapshot.clone()),
            Box::new(|| NOW),
        );
        engine.init_declutter();
        engine.trigger_scheduled_declutter();
        engine.run_pending_tasks();

        let summary = engine.last_pass_summary().cloned().unwrap();
        prop_assert!(summary.tabs_archived <= cap);

        let archived: Vec<TabId> = engine.archive().enumerate().unwrap().iter().map(|e| e.id()).collect();
        assert_partition(&expected, &live_ids(&registry, &windows), &archived)?;

        let to_restore: Vec<TabId> = archived
            .iter()
            .zip(&restore_mask)
            .filter(|(_, restore)| **restore)
            .map(|(id, _)| *id)
            .collect();
        let restored = engine
            .unarchive_and_restore_tabs(windows[0], &to_restore, true, false)
            .unwrap();
        prop_assert_eq!(restored, to_restore.len());

        let archived: Vec<TabId> = engine.archive().enumerate().unwrap().iter().map(|e| e.id()).collect();
        assert_partition(&expected, &live_ids(&registry, &windows), &archived)?;
    }

    #[test]
    fn prop_archived_tabs_met_the_policy(
        shapes in prop::collection::vec(arb_tab_shape(), 1..30),
        threshold in 1..800i64,
    ) {
        let registry = Rc::new(RefCell::new(SourceRegistry::new()));
        let tabs: Vec<Tab> = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| build_tab(i as TabId + 1, shape))
            .collect();
        let originals = tabs.clone();
        registry.borrow_mut().add_source(Box::new(TabManager::with_tabs(tabs)));

        let settings = RetentionSettings {
            archive_age_threshold_hours: threshold,
            ..RetentionSettings::default()
        };
        let mut engine = ArchivalEngine::new(
            Rc::clone(&registry),
            InMemoryArchiveStore::new(),
            Box::new(BlobStateStore),
            Box::new(move || settings.clone()),
            Box::new(|| NOW),
        );
        engine.init_declutter();
        engine.trigger_scheduled_declutter();
        engine.run_pending_tasks();

        for entry in engine.archive().enumerate().unwrap() {
            let original = originals.iter().find(|t| t.id == entry.id()).unwrap();
            prop_assert!(original.group_id.is_none());
            prop_assert!(original.has_restorable_state());
            prop_assert!((NOW - original.last_active_ms) / HOUR >= threshold);
            prop_assert!(entry.archived_at_ms >= original.last_active_ms);
        }
    }
}
