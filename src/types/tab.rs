use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable tab identifier, unique within the process for the tab's lifetime.
pub type TabId = i64;

/// Marker for an unknown last-active time.
pub const INVALID_TIMESTAMP: i64 = -1;

/// Opaque token shared by every tab in the same tab group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a browser tab with the metadata the archiver reasons about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub title: String,
    /// Milliseconds since epoch, or [`INVALID_TIMESTAMP`].
    pub last_active_ms: i64,
    pub group_id: Option<GroupId>,
    pub parent_id: Option<TabId>,
    pub root_id: TabId,
    /// Serialized contents used to recreate the tab. `None` until the tab has been persisted.
    pub state: Option<Vec<u8>>,
}

impl Tab {
    /// Creates an ungrouped tab that is its own root.
    pub fn new(id: TabId, url: impl Into<String>, last_active_ms: i64) -> Self {
        let url = url.into();
        Self {
            id,
            title: url.clone(),
            url,
            last_active_ms,
            group_id: None,
            parent_id: None,
            root_id: id,
            state: None,
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_state(mut self, state: impl Into<Vec<u8>>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_parent(mut self, parent_id: TabId, root_id: TabId) -> Self {
        self.parent_id = Some(parent_id);
        self.root_id = root_id;
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }

    /// True when the tab carries contents that can be used to bring it back.
    pub fn has_restorable_state(&self) -> bool {
        self.state.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// URL key used for duplicate detection: fragment dropped, scheme and host lowercased.
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }
}

/// Normalizes a URL for duplicate comparison.
pub fn normalize_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    match without_fragment.split_once("://") {
        Some((scheme, rest)) => {
            let (authority, path) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            let path = if path.is_empty() { "/" } else { path };
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                authority.to_ascii_lowercase(),
                path
            )
        }
        None => without_fragment.to_string(),
    }
}

/// A tab's restorable state as produced by a [`TabStateStore`](crate::services::tab_state::TabStateStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabState {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub last_active_ms: i64,
    pub group_id: Option<GroupId>,
    pub parent_id: Option<TabId>,
    pub root_id: TabId,
    pub contents: Vec<u8>,
}

impl TabState {
    /// Rebuilds a frozen tab from this state. Ancestry is stripped so the tab
    /// cannot pull stale ordering into whichever collection receives it.
    pub fn into_frozen_tab(self) -> Tab {
        Tab {
            id: self.id,
            url: self.url,
            title: self.title,
            last_active_ms: self.last_active_ms,
            group_id: self.group_id,
            parent_id: None,
            root_id: self.id,
            state: Some(self.contents),
        }
    }
}

/// Where a recreated tab lands in its destination working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Front,
    End,
}
