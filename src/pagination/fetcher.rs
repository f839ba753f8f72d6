//! Page fetcher
//!
//! Turns a resource listing into a lazy stream of pages. Nothing is
//! requested until the stream is polled, and page N+1 is only requested
//! once the consumer polls again after taking page N.

use super::offset::OffsetPaginator;
use super::types::{NextPage, PaginationState};
use crate::error::Result;
use crate::http::ApiClient;
use crate::types::Page;
use futures::stream::{self, Stream};
use tracing::debug;

/// Fetches every page of a resource listing
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: ApiClient,
    paginator: OffsetPaginator,
}

impl PageFetcher {
    /// Create a fetcher over the given client
    pub fn new(client: ApiClient, paginator: OffsetPaginator) -> Self {
        Self { client, paginator }
    }

    /// The underlying client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Stream all pages of `endpoint`, starting at offset zero.
    ///
    /// `query` is sent with every page, ahead of the pagination parameters.
    /// The stream ends after the last page, or after the first error.
    pub fn pages(
        &self,
        source: impl Into<String>,
        endpoint: impl Into<String>,
        query: Vec<(String, String)>,
    ) -> impl Stream<Item = Result<Page>> + Send + 'static {
        let client = self.client.clone();
        let paginator = self.paginator.clone();
        let source = source.into();
        let endpoint = endpoint.into();

        stream::try_unfold(Some(PaginationState::new()), move |state| {
            let client = client.clone();
            let paginator = paginator.clone();
            let source = source.clone();
            let endpoint = endpoint.clone();
            let query = query.clone();

            async move {
                let Some(mut state) = state else {
                    return Ok(None);
                };

                let mut params = query;
                params.extend(paginator.params(&state));

                let response = client.get(&source, &endpoint, &params).await?;
                let skip = state.skip;
                let next = paginator.process_response(
                    response.total_count,
                    response.rows.len(),
                    &mut state,
                );
                debug!(
                    source = %source,
                    skip,
                    rows = response.rows.len(),
                    total = response.total_count,
                    done = next.is_done(),
                    "Fetched page"
                );

                let next_state = match next {
                    NextPage::Continue { .. } => Some(state),
                    NextPage::Done => None,
                };
                Ok(Some((response.rows, next_state)))
            }
        })
    }
}
