//! Source fetchers
//!
//! The per-source fetch itself is external. This module defines the
//! sub-queries the gateway hands out, the rows it expects back and the
//! registry mapping source ids to fetchers.

mod errors;
mod query;
mod rows;
mod source;

pub use errors::{FetchError, FetchResult};
pub use query::{DriverQuery, EnrichmentQuery};
pub use rows::{EntityId, EntityRow, RowSet};
pub use source::{FetchFuture, FetcherRegistry, SourceFetcher};
