//! Plan execution and result stitching
//!
//! # Execution Flow (strict order)
//!
//! 1. Resolve a fetcher for every planned source
//! 2. Fetch the driver page (and total count when requested)
//! 3. Fetch enrichment columns for the driver's ids, concurrently
//! 4. Apply the enrichment failure policy
//! 5. Merge rows in driver order
//!
//! # Invariants
//!
//! - Row order and page come from the driver only
//! - A driver failure always fails the request
//! - Enrichment failures are handled by one policy per request

mod config;
mod errors;
mod executor;
mod merger;
mod result;

pub use config::{EnrichmentFailurePolicy, ExecutorConfig};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use executor::PlanExecutor;
pub use merger::{FetchResults, ResultMerger};
pub use result::QueryResult;
