//! App Core for GitBrowser Archive.
//!
//! Central struct wiring the retention settings, the live windows, the archive
//! database and the archival engine together, and managing their lifecycle.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use tracing::{info, warn};

use crate::database::connection::Database;
use crate::managers::archive_store::ArchiveStore;
use crate::managers::source_registry::{SourceId, SourceRegistry};
use crate::managers::sqlite_archive_store::SqliteArchiveStore;
use crate::managers::tab_manager::{TabManager, TabSource};
use crate::services::archival_engine::{ArchivalEngine, TriggerOutcome};
use crate::services::clock::{Clock, SystemClock};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::tab_state::BlobStateStore;
use crate::types::archive::{ArchiveEntry, PassSummary};
use crate::types::errors::ArchiveError;
use crate::types::tab::{InsertPosition, Tab, TabId};

/// Central application struct holding the settings, the windows and the archiver.
///
/// Everything here lives on one thread; the engine and the registry share
/// state through `Rc<RefCell<_>>`.
pub struct App {
    pub settings_engine: Rc<RefCell<SettingsEngine>>,
    pub registry: Rc<RefCell<SourceRegistry>>,
    pub engine: ArchivalEngine<SqliteArchiveStore>,
    clock: Rc<dyn Clock>,
    primary_window: Option<SourceId>,
    next_tab_id: TabId,
}

impl App {
    /// Creates a new App backed by the archive database at `db_path`, the
    /// platform settings file and the wall clock.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let db = Database::open(db_path)?;
        Self::with_parts(db, None, Rc::new(SystemClock))
    }

    /// Creates an App from explicit parts. `settings_path` overrides the
    /// platform settings location.
    pub fn with_parts(
        db: Database,
        settings_path: Option<String>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, Box<dyn Error>> {
        let mut settings_engine = SettingsEngine::new(settings_path);
        if let Err(err) = settings_engine.load() {
            warn!(path = settings_engine.get_config_path(), error = %err, "settings unreadable; using defaults");
        }
        let settings_engine = Rc::new(RefCell::new(settings_engine));

        let archive = SqliteArchiveStore::new(db);
        let next_tab_id = archive
            .enumerate()
            .map_err(|e| format!("Archive scan failed: {}", e))?
            .iter()
            .map(|entry| entry.id())
            .max()
            .map_or(1, |id| id + 1);

        let registry = Rc::new(RefCell::new(SourceRegistry::new()));
        let settings = Rc::clone(&settings_engine);
        let engine_clock = Rc::clone(&clock);
        let engine = ArchivalEngine::new(
            Rc::clone(&registry),
            archive,
            Box::new(BlobStateStore),
            Box::new(move || settings.borrow().get_settings().clone()),
            Box::new(move || engine_clock.now_millis()),
        );

        Ok(Self {
            settings_engine,
            registry,
            engine,
            clock,
            primary_window: None,
            next_tab_id,
        })
    }

    /// Startup sequence: subscribe the archiver to window events.
    pub fn startup(&mut self) {
        self.engine.init_declutter();
        info!(next_tab_id = self.next_tab_id, "archive app started");
    }

    /// Shutdown sequence: detach the archiver and drop pending work.
    pub fn shutdown(&mut self) {
        self.engine.destroy();
    }

    /// Opens a window. The first window becomes the primary one and receives
    /// any archived tabs stranded while archiving was switched off.
    pub fn open_window(&mut self, initialized: bool) -> Result<SourceId, Box<dyn Error>> {
        let window = if initialized {
            TabManager::with_tabs(Vec::new())
        } else {
            TabManager::new()
        };
        let id = self.registry.borrow_mut().add_source(Box::new(window));
        self.engine.run_pending_tasks();

        if self.primary_window.is_none() {
            self.primary_window = Some(id);
            if !self.settings_engine.borrow().get_settings().archive_enabled
                && self.engine.archive().count()? > 0
            {
                self.engine.rescue_archived_tabs(id)?;
            }
        }
        Ok(id)
    }

    /// Reports a window as ready, letting the archiver pick it up.
    pub fn mark_window_ready(&mut self, window: SourceId) -> Result<bool, ArchiveError> {
        let ready = {
            let mut registry = self.registry.borrow_mut();
            if registry.source(window).is_none() {
                return Err(ArchiveError::SourceNotFound(window));
            }
            registry.mark_source_initialized(window)
        };
        self.engine.run_pending_tasks();
        Ok(ready)
    }

    /// Closes a window and everything in it.
    pub fn close_window(&mut self, window: SourceId) -> Result<usize, ArchiveError> {
        let removed = self
            .registry
            .borrow_mut()
            .remove_source(window)
            .ok_or(ArchiveError::SourceNotFound(window))?;
        if self.primary_window == Some(window) {
            self.primary_window = self.registry.borrow().source_ids().first().copied();
        }
        self.engine.run_pending_tasks();
        Ok(removed.count())
    }

    /// Appends a new tab to `window`. Without `last_active_ms` the tab counts
    /// as active now.
    pub fn open_tab(
        &mut self,
        window: SourceId,
        url: &str,
        last_active_ms: Option<i64>,
        state: Option<Vec<u8>>,
    ) -> Result<TabId, Box<dyn Error>> {
        let id = self.next_tab_id;
        let mut tab = Tab::new(id, url, last_active_ms.unwrap_or_else(|| self.clock.now_millis()));
        tab.state = state;

        let mut registry = self.registry.borrow_mut();
        let working_set = registry
            .source_mut(window)
            .ok_or(ArchiveError::SourceNotFound(window))?;
        working_set.insert_tab(tab, InsertPosition::End)?;
        self.next_tab_id += 1;
        Ok(id)
    }

    pub fn activate_tab(&mut self, window: SourceId, tab_id: TabId) -> Result<(), Box<dyn Error>> {
        let now_ms = self.clock.now_millis();
        let mut registry = self.registry.borrow_mut();
        let working_set = registry
            .source_mut(window)
            .ok_or(ArchiveError::SourceNotFound(window))?;
        working_set.switch_tab(tab_id, now_ms)?;
        Ok(())
    }

    /// Returns the tabs of `window` in order, with the active tab id.
    pub fn list_tabs(&self, window: SourceId) -> Result<(Vec<Tab>, Option<TabId>), ArchiveError> {
        let registry = self.registry.borrow();
        let working_set = registry
            .source(window)
            .ok_or(ArchiveError::SourceNotFound(window))?;
        let tabs = (0..working_set.count())
            .filter_map(|i| working_set.tab_at(i))
            .cloned()
            .collect();
        Ok((tabs, working_set.current_active_tab_id()))
    }

    /// Runs a full declutter pass to completion and returns its summary.
    pub fn run_declutter(&mut self) -> (TriggerOutcome, Option<PassSummary>) {
        let outcome = self.engine.trigger_scheduled_declutter();
        self.engine.run_pending_tasks();
        let summary = match outcome {
            TriggerOutcome::Started { .. } => self.engine.last_pass_summary().cloned(),
            _ => None,
        };
        (outcome, summary)
    }

    pub fn archived_entries(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        self.engine.archive().enumerate()
    }

    /// Updates one retention setting. Switching archiving off rescues every
    /// archived tab into the primary window; returns how many came back.
    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) -> Result<usize, Box<dyn Error>> {
        let was_enabled = self.settings_engine.borrow().get_settings().archive_enabled;
        self.settings_engine.borrow_mut().set_value(key, value)?;
        let now_enabled = self.settings_engine.borrow().get_settings().archive_enabled;

        if !was_enabled || now_enabled {
            return Ok(0);
        }
        match self.primary_window {
            Some(window) => Ok(self.engine.rescue_archived_tabs(window)?),
            None => {
                info!("archiving disabled with no window open; rescue deferred");
                Ok(0)
            }
        }
    }

    pub fn primary_window(&self) -> Option<SourceId> {
        self.primary_window
    }
}
