//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, and reset behavior.

use gitbrowser_archive::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use gitbrowser_archive::types::errors::SettingsError;
use gitbrowser_archive::types::settings::RetentionSettings;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("archive_settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_defaults_match_retention_policy() {
    let settings = RetentionSettings::default();
    assert!(settings.archive_enabled);
    assert!(settings.auto_delete_enabled);
    assert_eq!(settings.archive_age_threshold_hours, 504);
    assert_eq!(settings.delete_age_threshold_hours, 1440);
    assert!(!settings.archive_duplicate_tabs);
    assert!(!settings.archive_tab_groups);
    assert_eq!(settings.max_simultaneous_archives, 1000);
}

/// After calling `set_value`, the change must be persisted to disk so that a
/// completely new SettingsEngine instance reading the same file sees the update.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("archive_tab_groups", serde_json::Value::Bool(true))
            .unwrap();
        engine
            .set_value("max_simultaneous_archives", serde_json::json!(25))
            .unwrap();
    }

    let mut engine2 = engine_in_temp(&dir);
    let loaded = engine2.load().unwrap();
    assert!(loaded.archive_tab_groups);
    assert_eq!(loaded.max_simultaneous_archives, 25);
}

#[test]
fn test_rejected_value_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine
        .set_value("delete_age_threshold_hours", serde_json::json!(48))
        .unwrap();

    let result = engine.set_value("delete_age_threshold_hours", serde_json::json!("soon"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap().delete_age_threshold_hours, 48);
}

/// After modifying settings and calling `reset()`, all values must revert to
/// defaults and the defaults must be persisted to disk.
#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine
        .set_value("archive_enabled", serde_json::Value::Bool(false))
        .unwrap();
    engine.reset().unwrap();

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), RetentionSettings::default());
}

#[test]
fn test_saved_file_is_pretty_json() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in_temp(&dir);
    engine.save().unwrap();

    let content = std::fs::read_to_string(engine.get_config_path()).unwrap();
    assert!(content.contains("\n"));
    assert!(content.contains("\"archive_age_threshold_hours\": 504"));
}
