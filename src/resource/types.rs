//! Resource descriptors
//!
//! One static entry per syncable Insightly entity. Capabilities are resolved
//! here once instead of being re-checked by name at each call site.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Name of the dependent links relationship
pub const LINKS: &str = "links";

/// Static description of a syncable entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Stream name
    pub name: &'static str,
    /// Unique-id field
    pub id_field: &'static str,
    /// Endpoint path relative to the API root
    pub endpoint: &'static str,
    /// Supports `updated_after_utc` filtering through `<endpoint>/Search`
    pub can_filter: bool,
    /// Rows trigger a dependent `<endpoint>/<id>/Links` lookup
    pub has_links: bool,
    /// Rows carry a `CUSTOMFIELDS` array to flatten
    pub has_custom_fields: bool,
    /// Rows carry a free-text `BODY` subject to truncation
    pub has_note_body: bool,
}

impl ResourceDescriptor {
    const fn plain(name: &'static str, id_field: &'static str, endpoint: &'static str) -> Self {
        Self {
            name,
            id_field,
            endpoint,
            can_filter: false,
            has_links: false,
            has_custom_fields: false,
            has_note_body: false,
        }
    }

    /// Listing path, routed to `/Search` when an incremental filter is applied
    pub fn listing_path(&self, filtered: bool) -> String {
        if filtered {
            format!("{}/Search", self.endpoint)
        } else {
            self.endpoint.to_string()
        }
    }

    /// Dependent links path for one parent row
    pub fn links_path(&self, parent_id: &str) -> String {
        format!("{}/{parent_id}/Links", self.endpoint)
    }

    /// Whether this is the links relationship itself
    pub fn is_links(&self) -> bool {
        self.name == LINKS
    }
}

/// Every resource the tap knows about
pub static RESOURCES: &[ResourceDescriptor] = &[
    ResourceDescriptor {
        can_filter: true,
        has_links: true,
        has_custom_fields: true,
        ..ResourceDescriptor::plain("contacts", "CONTACT_ID", "contacts")
    },
    ResourceDescriptor::plain(LINKS, "LINK_ID", "links"),
    ResourceDescriptor {
        has_links: true,
        has_note_body: true,
        ..ResourceDescriptor::plain("notes", "NOTE_ID", "notes")
    },
    ResourceDescriptor {
        can_filter: true,
        has_links: true,
        has_custom_fields: true,
        ..ResourceDescriptor::plain("opportunities", "OPPORTUNITY_ID", "opportunities")
    },
    // Organisations have links too; left out to save API calls
    ResourceDescriptor {
        can_filter: true,
        ..ResourceDescriptor::plain("organisations", "ORGANISATION_ID", "organisations")
    },
    ResourceDescriptor::plain("pipeline_stages", "STAGE_ID", "PipelineStages"),
    ResourceDescriptor::plain("pipelines", "PIPELINE_ID", "pipelines"),
    ResourceDescriptor {
        can_filter: true,
        ..ResourceDescriptor::plain("users", "USER_ID", "users")
    },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static ResourceDescriptor>> =
    Lazy::new(|| RESOURCES.iter().map(|r| (r.name, r)).collect());

/// Look up a resource by stream name
pub fn find(name: &str) -> Option<&'static ResourceDescriptor> {
    BY_NAME.get(name).copied()
}

/// Look up a resource by stream name, failing for unknown names
pub fn get(name: &str) -> Result<&'static ResourceDescriptor> {
    find(name).ok_or_else(|| Error::UnknownResource {
        resource: name.to_string(),
    })
}
