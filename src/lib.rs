// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-insightly
//!
//! Singer tap for the Insightly CRM REST API.
//!
//! Drains every selected Insightly resource into a Singer message stream,
//! concurrently, under a shared rate limit and concurrency cap, resuming
//! incrementally from per-resource bookmarks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tap_insightly::{Catalog, SingerSink, StateManager, SyncEngine, TapConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> tap_insightly::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let mut catalog = Catalog::discover()?;
//!     catalog.select(&["contacts", "links"]);
//!
//!     let state = StateManager::from_file("state.json")?;
//!     let engine = SyncEngine::from_config(&config, Arc::new(SingerSink::stdout()), state)?;
//!     let stats = engine.run(&catalog).await?;
//!     eprintln!("{} records", stats.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Sync Orchestrator                        │
//! │  select → links schema → launch → await → commit → links     │
//! └──────────────────────────────────────────────────────────────┘
//!          │ one worker per resource             │ links tasks
//! ┌────────┴─────────┬──────────────┬────────────┴───────────────┐
//! │   PageFetcher    │  RowShaper   │        RecordSink          │
//! │  skip/top pages  │  truncation  │  schema transform, Singer  │
//! └────────┬─────────┴──────────────┴────────────────────────────┘
//!          │
//! ┌────────┴─────────────────────────────────────────────────────┐
//! │   ApiClient: ConcurrencyGate → RateLimiter → GET             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Rate-limited, concurrency-capped API client
pub mod http;

/// Offset pagination and page streams
pub mod pagination;

/// Resource table and per-row shaping
pub mod resource;

/// Bundled schemas, discovery and stream selection
pub mod catalog;

/// Record sinks (Singer output)
pub mod sink;

/// Bookmark state and persistence
pub mod state;

/// Concurrent sync engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::Catalog;
pub use config::TapConfig;
pub use engine::{SyncEngine, SyncStats};
pub use error::{Error, Result};
pub use sink::{MemorySink, RecordSink, SingerSink};
pub use state::StateManager;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
