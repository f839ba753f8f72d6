//! Catalog module
//!
//! Discovery from the bundled schemas, catalog files, and stream selection.

mod schemas;
mod types;

pub use schemas::{bundled_schema, load_schema};
pub use types::{Catalog, CatalogEntry, MetadataEntry};
