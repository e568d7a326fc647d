// GitBrowser archive state managers
// Managers own the tab collections: live working sets, the source registry and the archive stores.

pub mod archive_store;
pub mod source_registry;
pub mod sqlite_archive_store;
pub mod tab_manager;
