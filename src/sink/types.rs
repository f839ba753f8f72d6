//! Singer message types

use crate::state::BookmarkState;
use crate::types::{JsonValue, Row};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of Singer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Schema declaration, emitted before a stream's first record
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
    },
    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// Record body, already validated against the stream schema
        record: Row,
        /// When extraction of the stream started
        time_extracted: DateTime<Utc>,
    },
    /// Committed bookmark state
    State {
        /// State value
        value: BookmarkState,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: JsonValue,
        key_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
        }
    }

    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Row, time_extracted: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted,
        }
    }

    /// Create a state message
    pub fn state(value: BookmarkState) -> Self {
        Self::State { value }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Stream this message belongs to (state messages have none)
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }
}
