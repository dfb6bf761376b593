//! Sub-queries sent to individual sources

use serde::{Deserialize, Serialize};

use crate::catalog::AttributeId;
use crate::request::{
    Expression, FilterNode, OrderByExpression, Pagination, QueryRequest, TimeAggregation, TimeRange,
};

use super::rows::EntityId;

/// Query run by the driver source, or by the only source of a
/// single-source plan. Owns filtering, ordering and the page window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverQuery {
    pub entity_type: String,
    /// Attributes the fetcher keys returned rows by
    pub id_attributes: Vec<AttributeId>,
    pub time_range: Option<TimeRange>,
    pub selections: Vec<Expression>,
    pub metric_selections: Vec<Expression>,
    pub time_aggregations: Vec<TimeAggregation>,
    pub group_by: Vec<Expression>,
    pub filter: Option<FilterNode>,
    pub order_by: Vec<OrderByExpression>,
    pub pagination: Pagination,
    pub include_total: bool,
}

impl DriverQuery {
    /// The whole request, forwarded verbatim
    pub fn from_request(request: &QueryRequest, id_attributes: Vec<AttributeId>) -> Self {
        Self {
            entity_type: request.entity_type.clone(),
            id_attributes,
            time_range: request.time_range,
            selections: request.selections.clone(),
            metric_selections: request.metric_selections.clone(),
            time_aggregations: request.time_aggregations.clone(),
            group_by: request.group_by.clone(),
            filter: request.filter.clone(),
            order_by: request.order_by.clone(),
            pagination: request.pagination,
            include_total: request.include_total,
        }
    }

    /// Result column names this query produces besides the id attributes
    pub fn result_columns(&self) -> Vec<&str> {
        self.selections
            .iter()
            .chain(self.metric_selections.iter())
            .map(Expression::result_name)
            .chain(self.time_aggregations.iter().map(TimeAggregation::result_name))
            .collect()
    }
}

/// Query scoped to a fixed id set. No filter, no ordering, no paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentQuery {
    pub entity_type: String,
    pub id_attributes: Vec<AttributeId>,
    /// Ids returned by the driver, in driver order
    pub entity_ids: Vec<EntityId>,
    pub time_range: Option<TimeRange>,
    pub selections: Vec<Expression>,
    pub metric_selections: Vec<Expression>,
    pub time_aggregations: Vec<TimeAggregation>,
}
