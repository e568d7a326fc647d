//! Property-based tests for RetentionSettings persistence.
//!
//! Whatever the user stores through the settings engine must come back
//! unchanged after a restart, and a rejected update must leave both the
//! in-memory and the on-disk settings untouched.

use gitbrowser_archive::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use gitbrowser_archive::types::settings::RetentionSettings;
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn arb_retention_settings() -> impl Strategy<Value = RetentionSettings> {
    (
        any::<bool>(),
        any::<bool>(),
        0i64..10_000,
        0i64..20_000,
        any::<bool>(),
        any::<bool>(),
        0usize..5_000,
    )
        .prop_map(
            |(
                archive_enabled,
                auto_delete_enabled,
                archive_age_threshold_hours,
                delete_age_threshold_hours,
                archive_duplicate_tabs,
                archive_tab_groups,
                max_simultaneous_archives,
            )| RetentionSettings {
                archive_enabled,
                auto_delete_enabled,
                archive_age_threshold_hours,
                delete_age_threshold_hours,
                archive_duplicate_tabs,
                archive_tab_groups,
                max_simultaneous_archives,
            },
        )
}

fn engine_at(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("archive_settings.json");
    SettingsEngine::new(Some(path.to_string_lossy().to_string()))
}

/// Applies every field of `target` through dot-key updates.
fn apply_all(engine: &mut SettingsEngine, target: &RetentionSettings) {
    engine.set_value("archive_enabled", json!(target.archive_enabled)).unwrap();
    engine.set_value("auto_delete_enabled", json!(target.auto_delete_enabled)).unwrap();
    engine
        .set_value("archive_age_threshold_hours", json!(target.archive_age_threshold_hours))
        .unwrap();
    engine
        .set_value("delete_age_threshold_hours", json!(target.delete_age_threshold_hours))
        .unwrap();
    engine.set_value("archive_duplicate_tabs", json!(target.archive_duplicate_tabs)).unwrap();
    engine.set_value("archive_tab_groups", json!(target.archive_tab_groups)).unwrap();
    engine
        .set_value("max_simultaneous_archives", json!(target.max_simultaneous_archives))
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_survive_reload(target in arb_retention_settings()) {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(&dir);
        engine.load().unwrap();
        apply_all(&mut engine, &target);
        prop_assert_eq!(engine.get_settings(), &target);

        let mut reloaded = engine_at(&dir);
        prop_assert_eq!(reloaded.load().unwrap(), target);
    }

    #[test]
    fn rejected_update_changes_nothing(
        target in arb_retention_settings(),
        bad in "[a-z ]{1,12}",
    ) {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(&dir);
        apply_all(&mut engine, &target);

        let result = engine.set_value("archive_age_threshold_hours", json!(bad));
        prop_assert!(result.is_err());
        prop_assert_eq!(engine.get_settings(), &target);

        let mut reloaded = engine_at(&dir);
        prop_assert_eq!(reloaded.load().unwrap(), target);
    }
}
