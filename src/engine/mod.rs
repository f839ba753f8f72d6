//! Execution engine module
//!
//! Concurrent extraction of every selected resource.
//!
//! # Overview
//!
//! One sync runs through these phases:
//!
//! 1. Determine the selected streams from the catalog
//! 2. Declare the links schema, if links are selected and some selected
//!    resource produces them
//! 3. Launch one worker per selected primary resource, all concurrently
//! 4. Await every worker
//! 5. Commit one bookmark per resource (only if all workers succeeded)
//! 6. Start the links lookups recorded by the workers and await them
//!
//! All HTTP traffic shares one concurrency gate and one rate limiter. Links
//! lookups only start after phase 5, so they never delay page fetches or
//! the commit, and a links failure never rolls back committed bookmarks.

mod links;
mod types;
mod worker;

pub use links::fetch_links;
pub use types::{PendingLink, ResourceJob, SyncConfig, SyncStats, WorkerOutcome};
pub use worker::{sync_resource, SyncContext, UPDATED_AFTER_PARAM};

use crate::catalog::Catalog;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::http::{ApiClient, HttpClientConfig};
use crate::pagination::{OffsetPaginator, PageFetcher};
use crate::resource::{self, RowShaper, LINKS};
use crate::sink::RecordSink;
use crate::state::StateManager;
use crate::types::FailurePolicy;
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client (gate and rate limiter included)
    client: ApiClient,
    /// Output sink
    sink: Arc<dyn RecordSink>,
    /// State manager
    state: StateManager,
    /// Row shaping rules
    shaper: RowShaper,
    /// Sync configuration
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: ApiClient, sink: Arc<dyn RecordSink>, state: StateManager) -> Self {
        Self {
            client,
            sink,
            state,
            shaper: RowShaper::default(),
            config: SyncConfig::default(),
        }
    }

    /// Create an engine from tap configuration
    pub fn from_config(
        config: &TapConfig,
        sink: Arc<dyn RecordSink>,
        state: StateManager,
    ) -> Result<Self> {
        let client = ApiClient::new(&HttpClientConfig::from(config))?;
        Ok(Self::new(client, sink, state)
            .with_config(SyncConfig::from(config))
            .with_shaper(RowShaper::from(config)))
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Set row shaping rules
    #[must_use]
    pub fn with_shaper(mut self, shaper: RowShaper) -> Self {
        self.shaper = shaper;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Sync every selected stream of `catalog`
    pub async fn run(&self, catalog: &Catalog) -> Result<SyncStats> {
        let start = Instant::now();
        let mut stats = SyncStats::new();

        // Selection
        let selected = catalog.selected_stream_ids();
        info!(streams = ?selected, "Starting sync");

        let mut primaries = Vec::new();
        for id in selected.iter().filter(|id| id.as_str() != LINKS) {
            primaries.push(resource::get(id)?);
        }

        // Links schema
        let links_wanted = selected.iter().any(|id| id == LINKS);
        let links_entry = if links_wanted && primaries.iter().any(|r| r.has_links) {
            let entry = catalog.require(LINKS)?;
            self.sink
                .declare_schema(LINKS, &entry.schema, &entry.key_properties)
                .await?;
            Some(Arc::new(entry.clone()))
        } else {
            if links_wanted {
                warn!("links selected without a selected resource that has links; skipping");
            }
            None
        };

        // Launch
        let mut jobs = Vec::with_capacity(primaries.len());
        for resource in primaries {
            let entry = catalog.require(resource.name)?;
            self.sink
                .declare_schema(resource.name, &entry.schema, &entry.key_properties)
                .await?;
            jobs.push(ResourceJob {
                resource,
                entry: Arc::new(entry.clone()),
                collect_links: links_entry.is_some() && resource.has_links,
                bookmark: self.state.get_since(resource.name).await,
            });
        }

        let ctx = SyncContext {
            fetcher: PageFetcher::new(
                self.client.clone(),
                OffsetPaginator::new(self.config.page_size),
            ),
            sink: Arc::clone(&self.sink),
            shaper: self.shaper.clone(),
        };
        let workers = jobs.into_iter().map(|job| sync_resource(&ctx, job));

        // Await
        let outcomes = match self.config.failure_policy {
            FailurePolicy::FailFast => try_join_all(workers).await.inspect_err(|e| {
                error!(error = %e, "Resource failed; remaining resources cancelled");
            })?,
            FailurePolicy::WaitAll => collect_outcomes(join_all(workers).await)?,
        };

        // Commit
        let extracted: Vec<_> = outcomes
            .iter()
            .map(|o| (o.resource.to_string(), o.extraction_time))
            .collect();
        self.state.commit(&extracted, self.sink.as_ref()).await?;

        for outcome in &outcomes {
            stats.add_records(outcome.resource, outcome.records);
            stats.pages_fetched += outcome.pages;
            stats.streams_synced += 1;
            stats.link_lookups += outcome.pending_links.len();
        }

        // Links
        let mut link_tasks = JoinSet::new();
        if let Some(links) = &links_entry {
            for outcome in outcomes {
                for pending in outcome.pending_links {
                    link_tasks.spawn(fetch_links(
                        ctx.clone(),
                        pending.parent,
                        pending.parent_id,
                        Arc::clone(links),
                        outcome.extraction_time,
                    ));
                }
            }
        }
        if !link_tasks.is_empty() {
            info!(lookups = link_tasks.len(), "Fetching links");
        }

        let mut link_failures = Vec::new();
        while let Some(joined) = link_tasks.join_next().await {
            match joined {
                Ok(Ok(emitted)) => stats.add_records(LINKS, emitted),
                Ok(Err(e)) => link_failures.push(e),
                Err(e) => {
                    error!(error = %e, "Links task panicked");
                    link_failures.push(Error::task(e.to_string()));
                }
            }
        }

        stats.link_failures = link_failures.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            records = stats.total_records(),
            pages = stats.pages_fetched,
            streams = stats.streams_synced,
            link_failures = stats.link_failures,
            duration_ms = stats.duration_ms,
            "Sync finished"
        );

        if !link_failures.is_empty() {
            return Err(Error::LinksFailed {
                failed: link_failures.len(),
                first: Box::new(link_failures.swap_remove(0)),
            });
        }
        Ok(stats)
    }
}

/// Keep every success if nothing failed; otherwise report the failures.
/// Links recorded by successful workers are discarded with their outcomes.
fn collect_outcomes(results: Vec<Result<WorkerOutcome>>) -> Result<Vec<WorkerOutcome>> {
    let mut outcomes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(error = %e, "Resource failed");
                failures.push(e);
            }
        }
    }

    match failures.len() {
        0 => Ok(outcomes),
        1 => Err(failures.swap_remove(0)),
        failed => Err(Error::ResourcesFailed {
            failed,
            first: Box::new(failures.swap_remove(0)),
        }),
    }
}

#[cfg(test)]
mod tests;
