//! In-memory sink

use super::{record_message, Message, RecordSink};
use crate::catalog::MetadataEntry;
use crate::error::Result;
use crate::state::BookmarkState;
use crate::types::{JsonValue, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects every message in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All messages so far
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// Records emitted for `stream`, in order
    pub fn records(&self, stream: &str) -> Vec<Row> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                Message::Record { stream: s, record, .. } if s == stream => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Extraction timestamps of the records emitted for `stream`
    pub fn extraction_times(&self, stream: &str) -> Vec<DateTime<Utc>> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s,
                    time_extracted,
                    ..
                } if s == stream => Some(*time_extracted),
                _ => None,
            })
            .collect()
    }

    /// Streams whose schema was declared, in order
    pub fn declared_streams(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream.clone()),
                _ => None,
            })
            .collect()
    }

    /// Committed states, in order
    pub fn states(&self) -> Vec<BookmarkState> {
        self.lock()
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn declare_schema(
        &self,
        stream: &str,
        schema: &JsonValue,
        key_properties: &[String],
    ) -> Result<()> {
        self.lock().push(Message::schema(
            stream,
            schema.clone(),
            key_properties.to_vec(),
        ));
        Ok(())
    }

    async fn emit(
        &self,
        stream: &str,
        row: Row,
        schema: &JsonValue,
        metadata: &[MetadataEntry],
        extraction_time: DateTime<Utc>,
    ) -> Result<()> {
        let message = record_message(stream, row, schema, metadata, extraction_time)?;
        self.lock().push(message);
        Ok(())
    }

    async fn commit_state(&self, state: &BookmarkState) -> Result<()> {
        self.lock().push(Message::state(state.clone()));
        Ok(())
    }
}
