//! Singer output
//!
//! One JSON message per line. Records are serialized while holding the
//! writer lock so concurrent workers never interleave partial lines.

use super::{record_message, Message, RecordSink};
use crate::catalog::MetadataEntry;
use crate::error::{Error, Result};
use crate::state::BookmarkState;
use crate::types::{JsonValue, Row};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::{Stdout, Write};
use std::sync::{Mutex, PoisonError};

/// Writes Singer messages to `W`
#[derive(Debug)]
pub struct SingerSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl SingerSink<Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> SingerSink<W> {
    /// Create a sink over a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_message(&self, message: &Message, flush: bool) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        if flush {
            writer.flush()?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for SingerSink<W> {
    async fn declare_schema(
        &self,
        stream: &str,
        schema: &JsonValue,
        key_properties: &[String],
    ) -> Result<()> {
        let message = Message::schema(stream, schema.clone(), key_properties.to_vec());
        self.write_message(&message, true)
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
        self.write_message(&message, false)
    }

    async fn commit_state(&self, state: &BookmarkState) -> Result<()> {
        self.write_message(&Message::state(state.clone()), true)
            .map_err(|e| Error::state(format!("Failed to emit state: {e}")))
    }
}
