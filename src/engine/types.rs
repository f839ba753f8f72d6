//! Engine types

use crate::catalog::CatalogEntry;
use crate::config::TapConfig;
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::resource::ResourceDescriptor;
use crate::types::FailurePolicy;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Rows requested per page
    pub page_size: u32,
    /// What happens to sibling workers when one fails
    pub failure_policy: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl From<&TapConfig> for SyncConfig {
    fn from(config: &TapConfig) -> Self {
        Self {
            page_size: config.page_size,
            failure_policy: config.failure_policy,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Statistics for a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records emitted per stream (links included)
    pub records_synced: BTreeMap<String, u64>,
    /// Total pages fetched across primary resources
    pub pages_fetched: u64,
    /// Primary resources synced to completion
    pub streams_synced: usize,
    /// Link lookups issued
    pub link_lookups: usize,
    /// Link lookups that failed
    pub link_failures: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records for a stream
    pub fn add_records(&mut self, stream: &str, count: u64) {
        *self.records_synced.entry(stream.to_string()).or_default() += count;
    }

    /// Records emitted for one stream
    pub fn records_for(&self, stream: &str) -> u64 {
        self.records_synced.get(stream).copied().unwrap_or(0)
    }

    /// Records emitted across all streams
    pub fn total_records(&self) -> u64 {
        self.records_synced.values().sum()
    }
}

/// Everything a worker needs to sync one primary resource
#[derive(Debug, Clone)]
pub struct ResourceJob {
    /// Resource to sync
    pub resource: &'static ResourceDescriptor,
    /// Catalog entry (schema and metadata) for the resource
    pub entry: Arc<CatalogEntry>,
    /// Record a links lookup per row
    pub collect_links: bool,
    /// Bookmark from the previous run
    pub bookmark: Option<String>,
}

/// Result of a completed primary worker
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Resource name
    pub resource: &'static str,
    /// Instant the worker started; becomes the resource's bookmark
    pub extraction_time: DateTime<Utc>,
    /// Records emitted
    pub records: u64,
    /// Pages fetched
    pub pages: u64,
    /// Links lookups to run once bookmarks are committed
    pub pending_links: Vec<PendingLink>,
}

/// A links lookup recorded by a worker but not yet started
#[derive(Debug, Clone)]
pub struct PendingLink {
    /// Resource the parent row belongs to
    pub parent: &'static ResourceDescriptor,
    /// Id of the parent row
    pub parent_id: String,
}
