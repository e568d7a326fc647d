//! Source Registry for GitBrowser archiving.
//!
//! Tracks every live working set (one per window) that can contribute tabs to
//! the archive, and tells registered observers when working sets appear, finish
//! restoring, or go away.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tab_manager::TabSource;

/// Identifier of a live working set within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// Handle returned when registering an observer; pass it back to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle notifications about working sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Added(SourceId),
    Initialized(SourceId),
    Removed(SourceId),
}

type SourceObserver = Box<dyn FnMut(SourceEvent)>;

/// Registry of live working sets.
pub struct SourceRegistry {
    sources: BTreeMap<SourceId, Box<dyn TabSource>>,
    observers: HashMap<ObserverId, SourceObserver>,
    next_id: u32,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            observers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers a working set and notifies observers. If it is already
    /// initialized, an `Initialized` event follows the `Added` one.
    pub fn add_source(&mut self, source: Box<dyn TabSource>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        let initialized = source.is_initialized();
        self.sources.insert(id, source);
        self.notify(SourceEvent::Added(id));
        if initialized {
            self.notify(SourceEvent::Initialized(id));
        }
        id
    }

    /// Marks a working set as restored. Returns false for unknown ids; a
    /// source that was already initialized is not announced twice.
    pub fn mark_source_initialized(&mut self, id: SourceId) -> bool {
        let Some(source) = self.sources.get_mut(&id) else {
            return false;
        };
        if source.is_initialized() {
            return true;
        }
        source.mark_initialized();
        self.notify(SourceEvent::Initialized(id));
        true
    }

    pub fn remove_source(&mut self, id: SourceId) -> Option<Box<dyn TabSource>> {
        let removed = self.sources.remove(&id)?;
        self.notify(SourceEvent::Removed(id));
        Some(removed)
    }

    /// Ids of every currently known working set, in registration order.
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    pub fn source(&self, id: SourceId) -> Option<&dyn TabSource> {
        self.sources.get(&id).map(|s| s.as_ref())
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut (dyn TabSource + 'static)> {
        self.sources.get_mut(&id).map(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn add_observer(&mut self, observer: impl FnMut(SourceEvent) + 'static) -> ObserverId {
        let id = ObserverId::new();
        self.observers.insert(id, Box::new(observer));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn notify(&mut self, event: SourceEvent) {
        for observer in self.observers.values_mut() {
            observer(event);
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
