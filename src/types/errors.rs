use thiserror::Error;

use super::tab::TabId;
use crate::managers::source_registry::SourceId;

// === ArchiveError ===

/// Errors raised by the archive store and the archiver's direct operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No live working set is registered under the given id.
    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),
    /// The archive already holds an entry for this tab id.
    #[error("Archive entry already exists: {0}")]
    DuplicateId(TabId),
    /// The archive holds no entry for this tab id.
    #[error("Archive entry not found: {0}")]
    EntryNotFound(TabId),
    /// The backing database rejected an operation.
    #[error("Archive database error: {0}")]
    Database(String),
    /// An entry could not be encoded or decoded.
    #[error("Archive serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for ArchiveError {
    fn from(err: rusqlite::Error) -> Self {
        ArchiveError::Database(err.to_string())
    }
}

// === TabError ===

/// Errors related to working-set operations.
#[derive(Debug, Error)]
pub enum TabError {
    /// Tab with the given ID was not found.
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// A tab with the given ID already exists.
    #[error("Tab already exists: {0}")]
    AlreadyExists(TabId),
}

// === SettingsError ===

/// Errors related to settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File I/O error.
    #[error("Settings I/O error: {0}")]
    Io(String),
    /// Serialization or deserialization error.
    #[error("Settings serialization error: {0}")]
    Serialization(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
