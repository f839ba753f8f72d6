//! State manager implementation
//!
//! Holds the bookmarks loaded at startup and commits new ones once a
//! sync's primary resources have all completed.

use super::types::BookmarkState;
use crate::error::{Error, Result};
use crate::sink::RecordSink;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// State manager for loading, committing and persisting bookmarks
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Where committed state is written (none for in-memory)
    output: Option<PathBuf>,
    /// Current state
    state: Arc<RwLock<BookmarkState>>,
}

impl StateManager {
    /// Create a state manager that persists to `path` on commit
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::in_memory().with_output(path)
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::with_state(BookmarkState::new())
    }

    /// Create an in-memory state manager holding `state`
    pub fn with_state(state: BookmarkState) -> Self {
        Self {
            output: None,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load state from a file. A missing file starts from empty state.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting fresh");
            return Ok(Self::in_memory());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
        Self::from_json(&contents)
    }

    /// Parse state from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: BookmarkState = serde_json::from_str(json)
            .map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))?;
        Ok(Self::with_state(state))
    }

    /// Persist committed state to `path`
    #[must_use]
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Output path, if any
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Check if this is an in-memory manager
    pub fn is_in_memory(&self) -> bool {
        self.output.is_none()
    }

    /// Bookmark for a resource
    pub async fn get_since(&self, resource: &str) -> Option<String> {
        self.state
            .read()
            .await
            .get_since(resource)
            .map(str::to_string)
    }

    /// Snapshot of the current state
    pub async fn snapshot(&self) -> BookmarkState {
        self.state.read().await.clone()
    }

    /// Write one bookmark per completed resource, emit the resulting state
    /// through the sink, then persist it.
    pub async fn commit(
        &self,
        extracted: &[(String, DateTime<Utc>)],
        sink: &dyn RecordSink,
    ) -> Result<BookmarkState> {
        let committed = {
            let mut state = self.state.write().await;
            for (resource, extracted_at) in extracted {
                state.write_bookmark(resource, *extracted_at);
            }
            state.clone()
        };

        sink.commit_state(&committed).await?;
        self.save_state(&committed).await?;
        info!(resources = extracted.len(), "Committed bookmarks");
        Ok(committed)
    }

    /// Save current state to the output path
    pub async fn save(&self) -> Result<()> {
        let state = self.snapshot().await;
        self.save_state(&state).await
    }

    async fn save_state(&self, state: &BookmarkState) -> Result<()> {
        let Some(path) = &self.output else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(path = %path.display(), "Saved state");
        Ok(())
    }
}
