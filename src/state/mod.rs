//! State management module
//!
//! Per-resource `since` bookmarks. A bookmark is the instant extraction
//! of its resource started, written only after every selected primary
//! resource finished successfully.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{format_bookmark, Bookmark, BookmarkState, BOOKMARK_FORMAT};
