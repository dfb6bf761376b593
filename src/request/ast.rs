//! Normalized logical request
//!
//! Produced upstream by request validation/normalization and consumed here
//! as-is: selections are already de-duplicated and scope filters injected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::AttributeId;

/// Aggregate function applied to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionType {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    DistinctCount,
    AvgRate,
}

impl FunctionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionType::Count => "COUNT",
            FunctionType::Sum => "SUM",
            FunctionType::Avg => "AVG",
            FunctionType::Min => "MIN",
            FunctionType::Max => "MAX",
            FunctionType::DistinctCount => "DISTINCTCOUNT",
            FunctionType::AvgRate => "AVGRATE",
        }
    }
}

/// A single result column: a plain attribute or a function of one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Column {
        attribute: AttributeId,
        #[serde(default)]
        alias: Option<String>,
    },
    Function {
        function: FunctionType,
        attribute: AttributeId,
        alias: String,
    },
}

impl Expression {
    /// Plain attribute column named after the attribute id
    pub fn column(attribute: impl Into<AttributeId>) -> Self {
        Expression::Column {
            attribute: attribute.into(),
            alias: None,
        }
    }

    /// Plain attribute column with an explicit result name
    pub fn column_as(attribute: impl Into<AttributeId>, alias: impl Into<String>) -> Self {
        Expression::Column {
            attribute: attribute.into(),
            alias: Some(alias.into()),
        }
    }

    /// Aggregate over an attribute
    pub fn function(
        function: FunctionType,
        attribute: impl Into<AttributeId>,
        alias: impl Into<String>,
    ) -> Self {
        Expression::Function {
            function,
            attribute: attribute.into(),
            alias: alias.into(),
        }
    }

    /// The attribute this expression reads
    pub fn attribute_id(&self) -> &AttributeId {
        match self {
            Expression::Column { attribute, .. } | Expression::Function { attribute, .. } => {
                attribute
            }
        }
    }

    /// Name of the produced result column
    pub fn result_name(&self) -> &str {
        match self {
            Expression::Column {
                alias: Some(alias), ..
            } => alias,
            Expression::Column { attribute, .. } => attribute.as_str(),
            Expression::Function { alias, .. } => alias,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Expression::Function { .. })
    }
}

/// Aggregation bucketed by a fixed time period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAggregation {
    pub period_secs: u64,
    pub aggregation: Expression,
}

impl TimeAggregation {
    pub fn new(period_secs: u64, aggregation: Expression) -> Self {
        Self {
            period_secs,
            aggregation,
        }
    }

    pub fn attribute_id(&self) -> &AttributeId {
        self.aggregation.attribute_id()
    }

    pub fn result_name(&self) -> &str {
        self.aggregation.result_name()
    }
}

/// Comparison operators available in filter leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::NotIn => "not_in",
            FilterOp::Like => "like",
        }
    }
}

/// Boolean filter predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Leaf {
        lhs: Expression,
        op: FilterOp,
        value: Value,
    },
}

impl FilterNode {
    pub fn leaf(attribute: impl Into<AttributeId>, op: FilterOp, value: Value) -> Self {
        FilterNode::Leaf {
            lhs: Expression::column(attribute),
            op,
            value,
        }
    }

    pub fn eq(attribute: impl Into<AttributeId>, value: Value) -> Self {
        Self::leaf(attribute, FilterOp::Eq, value)
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And(children)
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or(children)
    }

    /// Left-hand expressions of every leaf, depth first
    pub fn leaf_expressions(&self) -> Vec<&Expression> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Expression>) {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            FilterNode::Leaf { lhs, .. } => out.push(lhs),
        }
    }

    /// True if the tree has no leaf at all
    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                children.iter().all(FilterNode::is_empty)
            }
            FilterNode::Leaf { .. } => false,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Whether an order-by targets a plain column or an aggregate result.
///
/// The same name may exist as both, so the two kinds are tracked apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByKind {
    Selection,
    Metric,
}

/// Order-by entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByExpression {
    pub expression: Expression,
    pub order: SortOrder,
}

impl OrderByExpression {
    pub fn asc(expression: Expression) -> Self {
        Self {
            expression,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(expression: Expression) -> Self {
        Self {
            expression,
            order: SortOrder::Desc,
        }
    }

    pub fn kind(&self) -> OrderByKind {
        if self.expression.is_function() {
            OrderByKind::Metric
        } else {
            OrderByKind::Selection
        }
    }

    pub fn attribute_id(&self) -> &AttributeId {
        self.expression.attribute_id()
    }
}

/// Page window. `limit == 0` means the request is not paginated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    pub fn is_paginated(&self) -> bool {
        self.limit > 0
    }
}

/// Time window in epoch milliseconds, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_millis: i64,
    pub end_millis: i64,
}

/// Normalized entity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Entity type, also the attribute scope (e.g. `API`)
    pub entity_type: String,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub selections: Vec<Expression>,
    #[serde(default)]
    pub metric_selections: Vec<Expression>,
    #[serde(default)]
    pub time_aggregations: Vec<TimeAggregation>,
    #[serde(default)]
    pub group_by: Vec<Expression>,
    #[serde(default)]
    pub filter: Option<FilterNode>,
    #[serde(default)]
    pub order_by: Vec<OrderByExpression>,
    #[serde(default)]
    pub pagination: Pagination,
    /// Also report the total number of matching entities
    #[serde(default)]
    pub include_total: bool,
}

impl QueryRequest {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            time_range: None,
            selections: Vec::new(),
            metric_selections: Vec::new(),
            time_aggregations: Vec::new(),
            group_by: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            pagination: Pagination::default(),
            include_total: false,
        }
    }

    /// Adds a plain column selection
    pub fn select(mut self, attribute: impl Into<AttributeId>) -> Self {
        self.selections.push(Expression::column(attribute));
        self
    }

    pub fn with_selection(mut self, expression: Expression) -> Self {
        self.selections.push(expression);
        self
    }

    pub fn with_metric(mut self, expression: Expression) -> Self {
        self.metric_selections.push(expression);
        self
    }

    pub fn with_time_aggregation(mut self, aggregation: TimeAggregation) -> Self {
        self.time_aggregations.push(aggregation);
        self
    }

    pub fn with_group_by(mut self, expression: Expression) -> Self {
        self.group_by.push(expression);
        self
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: OrderByExpression) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn with_pagination(mut self, limit: u32, offset: u32) -> Self {
        self.pagination = Pagination::new(limit, offset);
        self
    }

    pub fn with_time_range(mut self, start_millis: i64, end_millis: i64) -> Self {
        self.time_range = Some(TimeRange {
            start_millis,
            end_millis,
        });
        self
    }

    pub fn with_total(mut self) -> Self {
        self.include_total = true;
        self
    }

    /// The filter, if it has at least one leaf
    pub fn effective_filter(&self) -> Option<&FilterNode> {
        self.filter.as_ref().filter(|f| !f.is_empty())
    }
}
