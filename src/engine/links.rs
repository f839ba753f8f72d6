//! Dependent links lookups

use super::worker::SyncContext;
use crate::catalog::CatalogEntry;
use crate::error::Result;
use crate::resource::{ResourceDescriptor, LINKS};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error};

/// Fetch and emit the links of one parent row.
///
/// A single unpaginated GET of `<endpoint>/<id>/Links`, through the same
/// gate and rate limiter as every other request. Returns the number of
/// link rows emitted.
pub async fn fetch_links(
    ctx: SyncContext,
    parent: &'static ResourceDescriptor,
    parent_id: String,
    links: Arc<CatalogEntry>,
    extraction_time: DateTime<Utc>,
) -> Result<u64> {
    let path = parent.links_path(&parent_id);
    let response = ctx
        .fetcher
        .client()
        .get(LINKS, &path, &[])
        .await
        .inspect_err(|e| {
            error!(parent = parent.name, %parent_id, error = %e, "Links lookup failed");
        })?;

    let mut emitted = 0;
    for row in response.rows {
        ctx.sink
            .emit(LINKS, row, &links.schema, &links.metadata, extraction_time)
            .await?;
        emitted += 1;
    }

    debug!(parent = parent.name, %parent_id, emitted, "Links emitted");
    Ok(emitted)
}
