//! HTTP module
//!
//! Request plumbing shared by every fetch in a run.
//!
//! # Features
//!
//! - **Rate Limiting**: Lazily replenished token bucket with polling backoff
//! - **Concurrency Gate**: Global bound on in-flight requests
//! - **Authentication**: HTTP Basic with the API key as username

mod client;
mod gate;
mod rate_limit;

pub use client::{
    ApiClient, ApiResponse, HttpClientConfig, HttpClientConfigBuilder, TOTAL_COUNT_HEADER,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
