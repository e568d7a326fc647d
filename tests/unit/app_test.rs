//! Unit tests for the App core: wiring of settings, windows, the SQLite
//! archive and the archival engine.

use std::cell::Cell;
use std::rc::Rc;

use gitbrowser_archive::app::App;
use gitbrowser_archive::database::Database;
use gitbrowser_archive::managers::source_registry::SourceId;
use gitbrowser_archive::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tempfile::TempDir;

const HOUR: i64 = 60 * 60 * 1000;
const NOW: i64 = 50_000 * HOUR;

fn settings_path(dir: &TempDir) -> String {
    dir.path().join("archive_settings.json").to_string_lossy().to_string()
}

fn app_in(dir: &TempDir, now: &Rc<Cell<i64>>) -> App {
    let db = Database::open(dir.path().join("archive.db")).unwrap();
    let clock = Rc::clone(now);
    let mut app = App::with_parts(db, Some(settings_path(dir)), Rc::new(move || clock.get())).unwrap();
    app.startup();
    app
}

/// Opens a window with a fresh active tab followed by a long-idle one.
fn window_with_idle_tab(app: &mut App) -> (SourceId, i64, i64) {
    let window = app.open_window(true).unwrap();
    let active = app.open_tab(window, "https://active.test", None, None).unwrap();
    let idle = app
        .open_tab(window, "https://idle.test", Some(NOW - 2_000 * HOUR), Some(vec![9, 9]))
        .unwrap();
    (window, active, idle)
}

#[test]
fn test_declutter_archives_idle_tab() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    let (window, active, idle) = window_with_idle_tab(&mut app);

    let (_, summary) = app.run_declutter();
    let summary = summary.unwrap();
    assert_eq!(summary.tabs_archived, 1);

    let (tabs, current) = app.list_tabs(window).unwrap();
    assert_eq!(tabs.iter().map(|t| t.id).collect::<Vec<_>>(), vec![active]);
    assert_eq!(current, Some(active));
    let archived = app.archived_entries().unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id(), idle);
}

#[test]
fn test_disabling_archiving_rescues_into_primary_window() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    let (window, _, idle) = window_with_idle_tab(&mut app);
    app.run_declutter();

    let rescued = app
        .set_setting("archive_enabled", serde_json::Value::Bool(false))
        .unwrap();
    assert_eq!(rescued, 1);
    assert!(app.archived_entries().unwrap().is_empty());
    let (tabs, _) = app.list_tabs(window).unwrap();
    assert!(tabs.iter().any(|t| t.id == idle));

    let again = app
        .set_setting("archive_enabled", serde_json::Value::Bool(false))
        .unwrap();
    assert_eq!(again, 0);
}

#[test]
fn test_archive_and_tab_ids_survive_restart() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let idle = {
        let mut app = app_in(&dir, &now);
        let (_, _, idle) = window_with_idle_tab(&mut app);
        app.run_declutter();
        app.shutdown();
        idle
    };

    let mut app = app_in(&dir, &now);
    let archived = app.archived_entries().unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id(), idle);

    let window = app.open_window(true).unwrap();
    let fresh = app.open_tab(window, "https://new.test", None, None).unwrap();
    assert!(fresh > idle);
}

#[test]
fn test_first_window_receives_stranded_archive() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let idle = {
        let mut app = app_in(&dir, &now);
        let (_, _, idle) = window_with_idle_tab(&mut app);
        app.run_declutter();
        idle
    };

    let mut settings = SettingsEngine::new(Some(settings_path(&dir)));
    settings.load().unwrap();
    settings
        .set_value("archive_enabled", serde_json::Value::Bool(false))
        .unwrap();

    let mut app = app_in(&dir, &now);
    let window = app.open_window(true).unwrap();
    assert_eq!(app.primary_window(), Some(window));
    let (tabs, _) = app.list_tabs(window).unwrap();
    assert_eq!(tabs.iter().map(|t| t.id).collect::<Vec<_>>(), vec![idle]);
    assert!(app.archived_entries().unwrap().is_empty());
}

#[test]
fn test_window_restored_later_is_archived_when_ready() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    let window = app.open_window(false).unwrap();
    app.open_tab(window, "https://active.test", None, None).unwrap();
    let idle = app
        .open_tab(window, "https://idle.test", Some(NOW - 900 * HOUR), Some(vec![1]))
        .unwrap();

    let (_, summary) = app.run_declutter();
    assert_eq!(summary.unwrap().sources_skipped, 1);
    assert!(app.archived_entries().unwrap().is_empty());

    assert!(app.mark_window_ready(window).unwrap());
    let archived = app.archived_entries().unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id(), idle);
}

#[test]
fn test_activate_tab_refreshes_activity() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    let (window, _, idle) = window_with_idle_tab(&mut app);

    app.activate_tab(window, idle).unwrap();
    let (tabs, current) = app.list_tabs(window).unwrap();
    assert_eq!(current, Some(idle));
    assert_eq!(tabs.iter().find(|t| t.id == idle).unwrap().last_active_ms, NOW);

    let (_, summary) = app.run_declutter();
    assert_eq!(summary.unwrap().tabs_archived, 0);
}

#[test]
fn test_unknown_window_is_an_error() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    assert!(app.open_tab(SourceId(9), "https://a.test", None, None).is_err());
    assert!(app.list_tabs(SourceId(9)).is_err());
    assert!(app.mark_window_ready(SourceId(9)).is_err());
    assert!(app.close_window(SourceId(9)).is_err());
}

#[test]
fn test_closing_primary_window_promotes_next() {
    let dir = TempDir::new().unwrap();
    let now = Rc::new(Cell::new(NOW));
    let mut app = app_in(&dir, &now);
    let (first, _, _) = window_with_idle_tab(&mut app);
    let second = app.open_window(true).unwrap();

    assert_eq!(app.close_window(first).unwrap(), 2);
    assert_eq!(app.primary_window(), Some(second));
}
