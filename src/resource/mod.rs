//! Resource module
//!
//! The static table of Insightly resources and the row shaping each one
//! needs before emission.

mod transform;
mod types;

pub use transform::{RowShaper, CUSTOM_FIELDS_SOURCE, CUSTOM_FIELDS_TARGET, NOTE_BODY};
pub use types::{find, get, ResourceDescriptor, LINKS, RESOURCES};
