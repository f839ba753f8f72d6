//! Per-row shaping
//!
//! Applied to every row before it reaches the sink:
//! - notes: `BODY` truncated to a character limit (optionally JSON-encoded afterwards)
//! - resources with custom fields: `CUSTOMFIELDS` flattened into a
//!   `custom_fields` JSON string keyed by `FIELD_NAME`

use super::types::ResourceDescriptor;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Row};

/// Source array of custom field entries
pub const CUSTOM_FIELDS_SOURCE: &str = "CUSTOMFIELDS";

/// Flattened custom fields column
pub const CUSTOM_FIELDS_TARGET: &str = "custom_fields";

/// Free-text note body column
pub const NOTE_BODY: &str = "BODY";

/// Shapes rows according to their resource's capabilities
#[derive(Debug, Clone)]
pub struct RowShaper {
    note_body_limit: usize,
    escape_note_body: bool,
}

impl Default for RowShaper {
    fn default() -> Self {
        Self {
            note_body_limit: 900,
            escape_note_body: false,
        }
    }
}

impl From<&TapConfig> for RowShaper {
    fn from(config: &TapConfig) -> Self {
        Self {
            note_body_limit: config.note_body_limit,
            escape_note_body: config.escape_note_body,
        }
    }
}

impl RowShaper {
    /// Create a shaper with the given note body limit
    pub fn new(note_body_limit: usize) -> Self {
        Self {
            note_body_limit,
            ..Self::default()
        }
    }

    /// JSON-encode note bodies after truncation
    #[must_use]
    pub fn with_escaped_note_body(mut self, escape: bool) -> Self {
        self.escape_note_body = escape;
        self
    }

    /// Shape one row in place
    pub fn shape(&self, resource: &ResourceDescriptor, row: &mut Row) -> Result<()> {
        if resource.has_note_body {
            truncate_field(row, NOTE_BODY, self.note_body_limit);
        }

        if resource.has_custom_fields {
            flatten_custom_fields(resource.name, row)?;
        }

        if resource.has_note_body && self.escape_note_body {
            if let Some(JsonValue::String(body)) = row.get(NOTE_BODY) {
                let encoded = serde_json::to_string(body)?;
                row.insert(NOTE_BODY.to_string(), JsonValue::String(encoded));
            }
        }

        Ok(())
    }
}

/// Cut a string field to at most `limit` characters; non-strings are left alone
fn truncate_field(row: &mut Row, field: &str, limit: usize) {
    if let Some(JsonValue::String(text)) = row.get_mut(field) {
        if let Some((cut, _)) = text.char_indices().nth(limit) {
            text.truncate(cut);
        }
    }
}

/// Replace the custom field entries with a `{FIELD_NAME: FIELD_VALUE}` JSON string.
/// Keys keep the order the API listed them in.
fn flatten_custom_fields(resource: &str, row: &mut Row) -> Result<()> {
    let entries = match row.get(CUSTOM_FIELDS_SOURCE) {
        Some(JsonValue::Array(entries)) => entries,
        Some(other) => {
            return Err(Error::transform(
                resource,
                format!("{CUSTOM_FIELDS_SOURCE} is not an array: {other}"),
            ))
        }
        None => {
            return Err(Error::transform(
                resource,
                format!("{CUSTOM_FIELDS_SOURCE} is missing"),
            ))
        }
    };

    let mut flattened = JsonObject::new();
    for (i, entry) in entries.iter().enumerate() {
        let name = entry
            .get("FIELD_NAME")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                Error::transform(
                    resource,
                    format!("{CUSTOM_FIELDS_SOURCE}[{i}] has no string FIELD_NAME"),
                )
            })?;
        let value = entry.get("FIELD_VALUE").ok_or_else(|| {
            Error::transform(
                resource,
                format!("{CUSTOM_FIELDS_SOURCE}[{i}] ({name}) has no FIELD_VALUE"),
            )
        })?;
        flattened.insert(name.to_string(), value.clone());
    }

    let encoded = serde_json::to_string(&flattened)?;
    row.insert(CUSTOM_FIELDS_TARGET.to_string(), JsonValue::String(encoded));
    Ok(())
}
