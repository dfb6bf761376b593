//! Attribute catalog access
//!
//! The catalog tells the planner which backend sources can serve each
//! attribute. It is consumed, not owned: the planner only reads it, and
//! answers are cached for the lifetime of one request.

mod errors;
mod memory;
mod provider;
mod types;

pub use errors::{CatalogError, CatalogResult};
pub use memory::InMemoryCatalog;
pub use provider::{AttributeCatalog, RequestAttributeCache};
pub use types::{AttributeId, AttributeMetadata, SourceId};
