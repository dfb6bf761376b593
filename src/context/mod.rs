//! Execution context
//!
//! Source-indexed view of a request built once per request from catalog
//! capabilities. The planner reads it to pick a driver and mutates only
//! the selection buckets while de-duplicating.

mod execution_context;

pub use execution_context::{
    AttributeSourceMap, ExecutionContext, SourceAttributeMap, SourceExpressionMap,
};
