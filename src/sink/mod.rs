//! Record sink module
//!
//! Where extracted rows go. A sink declares stream schemas, validates and
//! emits records, and receives committed state.
//!
//! - `SingerSink` - newline-delimited Singer messages on any writer (stdout in the binary)
//! - `MemorySink` - collects messages for inspection

mod memory;
mod singer;
mod transform;
mod types;

pub use memory::MemorySink;
pub use singer::SingerSink;
pub use transform::transform_record;
pub use types::Message;

use crate::catalog::MetadataEntry;
use crate::error::Result;
use crate::state::BookmarkState;
use crate::types::{JsonValue, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Destination for schemas, records and committed state.
///
/// Shared by every concurrent worker of a sync; implementations must keep
/// each message whole when called from several tasks at once.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Declare a stream's schema ahead of its records
    async fn declare_schema(
        &self,
        stream: &str,
        schema: &JsonValue,
        key_properties: &[String],
    ) -> Result<()>;

    /// Validate `row` against `schema` and `metadata`, then emit it.
    /// Fails with a validation error when the row cannot be made to conform.
    async fn emit(
        &self,
        stream: &str,
        row: Row,
        schema: &JsonValue,
        metadata: &[MetadataEntry],
        extraction_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Publish committed bookmark state
    async fn commit_state(&self, state: &BookmarkState) -> Result<()>;
}

/// Build the record message for a row, applying the schema transform
pub(crate) fn record_message(
    stream: &str,
    row: Row,
    schema: &JsonValue,
    metadata: &[MetadataEntry],
    extraction_time: DateTime<Utc>,
) -> Result<Message> {
    let record = transform_record(stream, row, schema, metadata)?;
    Ok(Message::record(stream, record, extraction_time))
}
