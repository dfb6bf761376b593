//! Execution plans produced by the planner

use serde::Serialize;

use crate::catalog::SourceId;
use crate::fetcher::{DriverQuery, EnrichmentQuery, EntityId};
use crate::request::{Expression, TimeAggregation};

/// Plan for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionPlan {
    /// One source serves the whole request
    SingleSource(SingleSourcePlan),
    /// A driver owns the id set, enrichment sources add columns
    MultiSource(MultiSourcePlan),
}

impl ExecutionPlan {
    /// The source owning filtering, ordering and pagination
    pub fn driver(&self) -> &SourceId {
        match self {
            ExecutionPlan::SingleSource(plan) => &plan.source,
            ExecutionPlan::MultiSource(plan) => &plan.driver,
        }
    }

    pub fn driver_query(&self) -> &DriverQuery {
        match self {
            ExecutionPlan::SingleSource(plan) => &plan.query,
            ExecutionPlan::MultiSource(plan) => &plan.driver_query,
        }
    }

    /// Enrichment fetches, empty for single-source plans
    pub fn enrichments(&self) -> &[EnrichmentPlan] {
        match self {
            ExecutionPlan::SingleSource(_) => &[],
            ExecutionPlan::MultiSource(plan) => &plan.enrichments,
        }
    }

    /// Every source the plan fetches from, driver first
    pub fn sources(&self) -> Vec<&SourceId> {
        std::iter::once(self.driver())
            .chain(self.enrichments().iter().map(|e| &e.source))
            .collect()
    }

    pub fn is_single_source(&self) -> bool {
        matches!(self, ExecutionPlan::SingleSource(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleSourcePlan {
    pub source: SourceId,
    /// The request, forwarded verbatim
    pub query: DriverQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSourcePlan {
    pub driver: SourceId,
    pub driver_query: DriverQuery,
    /// In rank order
    pub enrichments: Vec<EnrichmentPlan>,
}

/// Columns one enrichment source adds for the driver's ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentPlan {
    pub source: SourceId,
    pub selections: Vec<Expression>,
    pub metric_selections: Vec<Expression>,
    pub time_aggregations: Vec<TimeAggregation>,
}

impl EnrichmentPlan {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            selections: Vec::new(),
            metric_selections: Vec::new(),
            time_aggregations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
            && self.metric_selections.is_empty()
            && self.time_aggregations.is_empty()
    }

    /// Result columns this source is expected to fill
    pub fn expected_columns(&self) -> Vec<&str> {
        self.selections
            .iter()
            .chain(self.metric_selections.iter())
            .map(Expression::result_name)
            .chain(self.time_aggregations.iter().map(TimeAggregation::result_name))
            .collect()
    }

    /// Id-scoped query for the ids the driver returned
    pub fn to_query(&self, driver_query: &DriverQuery, entity_ids: Vec<EntityId>) -> EnrichmentQuery {
        EnrichmentQuery {
            entity_type: driver_query.entity_type.clone(),
            id_attributes: driver_query.id_attributes.clone(),
            entity_ids,
            time_range: driver_query.time_range,
            selections: self.selections.clone(),
            metric_selections: self.metric_selections.clone(),
            time_aggregations: self.time_aggregations.clone(),
        }
    }
}
