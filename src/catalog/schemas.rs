//! Bundled JSON schemas, one per resource

use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Raw schema document for a resource
pub fn bundled_schema(resource: &str) -> Option<&'static str> {
    let raw = match resource {
        "contacts" => include_str!("../../schemas/contacts.json"),
        "links" => include_str!("../../schemas/links.json"),
        "notes" => include_str!("../../schemas/notes.json"),
        "opportunities" => include_str!("../../schemas/opportunities.json"),
        "organisations" => include_str!("../../schemas/organisations.json"),
        "pipeline_stages" => include_str!("../../schemas/pipeline_stages.json"),
        "pipelines" => include_str!("../../schemas/pipelines.json"),
        "users" => include_str!("../../schemas/users.json"),
        _ => return None,
    };
    Some(raw)
}

/// Parsed schema for a resource
pub fn load_schema(resource: &str) -> Result<JsonValue> {
    let raw = bundled_schema(resource).ok_or_else(|| Error::UnknownResource {
        resource: resource.to_string(),
    })?;
    Ok(serde_json::from_str(raw)?)
}
