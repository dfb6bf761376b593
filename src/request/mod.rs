//! Request model consumed by the planner

mod ast;
mod context;

pub use ast::{
    Expression, FilterNode, FilterOp, FunctionType, OrderByExpression, OrderByKind, Pagination,
    QueryRequest, SortOrder, TimeAggregation, TimeRange,
};
pub use context::RequestContext;
