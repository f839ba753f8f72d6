//! Catalog types
//!
//! Singer catalog layout: one entry per stream with its schema, key
//! properties and breadcrumb-addressed metadata.

use super::schemas::load_schema;
use crate::error::{Error, Result, ResultExt};
use crate::resource::RESOURCES;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Catalog of streams available to (or selected for) a sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams
    pub streams: Vec<CatalogEntry>,
}

/// One stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream name
    pub stream: String,
    /// Stream identifier used for selection and lookup
    pub tap_stream_id: String,
    /// JSON schema for the stream's records
    pub schema: JsonValue,
    /// Breadcrumb-addressed metadata
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    /// Primary key fields
    #[serde(default)]
    pub key_properties: Vec<String>,
}

/// Metadata attached to a breadcrumb (`[]` for the stream, `["properties", field]` for a field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path the metadata applies to
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    /// Metadata values
    #[serde(default)]
    pub metadata: JsonObject,
}

impl MetadataEntry {
    fn new(breadcrumb: Vec<String>, metadata: JsonValue) -> Self {
        Self {
            breadcrumb,
            metadata: match metadata {
                JsonValue::Object(map) => map,
                _ => JsonObject::new(),
            },
        }
    }
}

impl Catalog {
    /// Build the catalog from the bundled schemas
    pub fn discover() -> Result<Self> {
        let streams = RESOURCES
            .iter()
            .map(|resource| {
                let schema = load_schema(resource.name)?;
                Ok(CatalogEntry::discovered(resource.name, resource.id_field, schema))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Parse a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find a stream by id
    pub fn get(&self, stream_id: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.tap_stream_id == stream_id)
    }

    /// Find a stream by id, failing when absent
    pub fn require(&self, stream_id: &str) -> Result<&CatalogEntry> {
        self.get(stream_id).ok_or_else(|| Error::StreamNotFound {
            stream: stream_id.to_string(),
        })
    }

    /// Ids of selected streams, in catalog order
    pub fn selected_stream_ids(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|s| s.is_selected())
            .map(|s| s.tap_stream_id.clone())
            .collect()
    }

    /// Mark streams as selected through their stream-level metadata
    pub fn select(&mut self, stream_ids: &[&str]) {
        for entry in &mut self.streams {
            if stream_ids.contains(&entry.tap_stream_id.as_str()) {
                entry.set_stream_metadata("selected", JsonValue::Bool(true));
            }
        }
    }
}

impl CatalogEntry {
    /// Entry as produced by discovery
    pub fn discovered(name: &str, id_field: &str, schema: JsonValue) -> Self {
        let mut metadata = vec![MetadataEntry::new(
            Vec::new(),
            json!({ "table-key-properties": [id_field] }),
        )];

        if let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) {
            for field in properties.keys() {
                let inclusion = if field == id_field {
                    "automatic"
                } else {
                    "available"
                };
                metadata.push(MetadataEntry::new(
                    vec!["properties".to_string(), field.clone()],
                    json!({ "inclusion": inclusion }),
                ));
            }
        }

        Self {
            stream: name.to_string(),
            tap_stream_id: name.to_string(),
            schema,
            metadata,
            key_properties: vec![id_field.to_string()],
        }
    }

    /// Selected via `schema.selected` or empty-breadcrumb `selected` metadata
    pub fn is_selected(&self) -> bool {
        if self.schema.get("selected").and_then(JsonValue::as_bool) == Some(true) {
            return true;
        }
        self.stream_metadata()
            .and_then(|m| m.get("selected"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    /// Stream-level (empty breadcrumb) metadata
    pub fn stream_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Metadata for one field
    pub fn field_metadata(&self, field: &str) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb == ["properties", field])
            .map(|m| &m.metadata)
    }

    fn set_stream_metadata(&mut self, key: &str, value: JsonValue) {
        if let Some(entry) = self.metadata.iter_mut().find(|m| m.breadcrumb.is_empty()) {
            entry.metadata.insert(key.to_string(), value);
        } else {
            let mut metadata = JsonObject::new();
            metadata.insert(key.to_string(), value);
            self.metadata.push(MetadataEntry {
                breadcrumb: Vec::new(),
                metadata,
            });
        }
    }
}
