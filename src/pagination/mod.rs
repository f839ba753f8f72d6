//! Pagination module
//!
//! Offset (`skip`/`top`) pagination terminated by the `x-total-count`
//! response header, and the lazy page stream built on it.

mod fetcher;
mod offset;
mod types;

pub use fetcher::PageFetcher;
pub use offset::{OffsetPaginator, DEFAULT_PAGE_SIZE};
pub use types::{NextPage, PaginationState};
