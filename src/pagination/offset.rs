//! Offset pagination driven by a total-count header
//!
//! Requests carry `skip`/`top`; the response's `x-total-count` decides
//! whether another page exists.

use super::types::{NextPage, PaginationState};

/// Default page size (`top`)
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Offset-based pagination terminated by the reported total
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for page size
    pub limit_param: String,
    /// Number of records per page
    pub page_size: u32,
}

impl Default for OffsetPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl OffsetPaginator {
    /// Create a `skip`/`top` paginator with the given page size
    pub fn new(page_size: u32) -> Self {
        Self {
            offset_param: "skip".to_string(),
            limit_param: "top".to_string(),
            page_size: page_size.max(1),
        }
    }

    /// Query parameters for the page at the current offset
    pub fn params(&self, state: &PaginationState) -> Vec<(String, String)> {
        vec![
            (self.offset_param.clone(), state.skip.to_string()),
            (self.limit_param.clone(), self.page_size.to_string()),
        ]
    }

    /// Account for a fetched page and decide whether to continue.
    ///
    /// Stops when the total is unknown or when this page's window already
    /// reaches it (`skip + page_size >= total`), so a total of `T` takes
    /// `ceil(T / page_size)` requests, or one request when `T` is zero.
    pub fn process_response(
        &self,
        total: Option<u64>,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);
        state.total = total;

        let page_size = u64::from(self.page_size);
        match total {
            Some(total) if state.skip + page_size < total => {
                state.add_offset(page_size);
                NextPage::Continue { skip: state.skip }
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
