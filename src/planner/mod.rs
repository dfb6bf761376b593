//! Execution planner
//!
//! Decides, per request, whether one source can answer it alone or which
//! source drives a multi-source plan and what every other source fetches.
//!
//! # Design Principles
//!
//! - Deterministic: same request, catalog and config give the same plan
//! - One driver: at most one source filters, orders and paginates
//! - Fetch once: every selection attribute comes from exactly one source
//! - Explicit: a request no single source can filter and order is rejected
//!
//! Planning is synchronous and does no I/O beyond catalog lookups.

mod config;
mod errors;
mod explain;
mod plan;
mod planner;
pub mod source_selection;

pub use config::PlannerConfig;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::{ExplainEnrichment, ExplainPlan};
pub use plan::{EnrichmentPlan, ExecutionPlan, MultiSourcePlan, SingleSourcePlan};
pub use planner::QueryPlanner;
