use serde::{Deserialize, Serialize};

/// Default inactivity window before a live tab may be archived (21 days).
pub const DEFAULT_ARCHIVE_AGE_THRESHOLD_HOURS: i64 = 21 * 24;
/// Default lifetime of an archive entry before automatic deletion (60 days).
pub const DEFAULT_DELETE_AGE_THRESHOLD_HOURS: i64 = 60 * 24;
/// Default upper bound on tabs archived by a single declutter pass.
pub const DEFAULT_MAX_SIMULTANEOUS_ARCHIVES: usize = 1000;

/// Tab archiving and auto-deletion settings.
///
/// Mutated by the user through the settings engine; the archiver only ever
/// reads a snapshot of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionSettings {
    pub archive_enabled: bool,
    pub auto_delete_enabled: bool,
    pub archive_age_threshold_hours: i64,
    pub delete_age_threshold_hours: i64,
    #[serde(default)]
    pub archive_duplicate_tabs: bool,
    #[serde(default)]
    pub archive_tab_groups: bool,
    #[serde(default = "default_max_simultaneous_archives")]
    pub max_simultaneous_archives: usize,
}

fn default_max_simultaneous_archives() -> usize {
    DEFAULT_MAX_SIMULTANEOUS_ARCHIVES
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            archive_enabled: true,
            auto_delete_enabled: true,
            archive_age_threshold_hours: DEFAULT_ARCHIVE_AGE_THRESHOLD_HOURS,
            delete_age_threshold_hours: DEFAULT_DELETE_AGE_THRESHOLD_HOURS,
            archive_duplicate_tabs: false,
            archive_tab_groups: false,
            max_simultaneous_archives: DEFAULT_MAX_SIMULTANEOUS_ARCHIVES,
        }
    }
}
