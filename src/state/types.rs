//! Bookmark state
//!
//! One `since` timestamp per resource. Serialized in the Singer layout
//! (`{"bookmarks": {...}}`); the flat `{"<resource>": {"since": ...}}`
//! layout is accepted on load as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format of bookmark timestamps (`YYYY-MM-DD HH:MM:SS`, UTC)
pub const BOOKMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp as a bookmark value
pub fn format_bookmark(time: DateTime<Utc>) -> String {
    time.format(BOOKMARK_FORMAT).to_string()
}

/// Complete bookmark state for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateRepr")]
pub struct BookmarkState {
    /// Per-resource bookmarks
    pub bookmarks: BTreeMap<String, Bookmark>,
}

/// Bookmark for a single resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Rows updated after this instant are requested on the next run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StateRepr {
    Singer {
        bookmarks: BTreeMap<String, Bookmark>,
    },
    Flat(BTreeMap<String, Bookmark>),
}

impl From<StateRepr> for BookmarkState {
    fn from(repr: StateRepr) -> Self {
        match repr {
            StateRepr::Singer { bookmarks } | StateRepr::Flat(bookmarks) => Self { bookmarks },
        }
    }
}

impl BookmarkState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark for a resource
    pub fn get_since(&self, resource: &str) -> Option<&str> {
        self.bookmarks.get(resource)?.since.as_deref()
    }

    /// Overwrite the bookmark for a resource
    pub fn set_since(&mut self, resource: &str, since: impl Into<String>) {
        self.bookmarks.insert(
            resource.to_string(),
            Bookmark {
                since: Some(since.into()),
            },
        );
    }

    /// Overwrite the bookmark for a resource from an extraction timestamp
    pub fn write_bookmark(&mut self, resource: &str, extracted_at: DateTime<Utc>) {
        self.set_since(resource, format_bookmark(extracted_at));
    }

    /// Check if no bookmarks are present
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }
}
