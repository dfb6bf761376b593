//! Execution planner
//!
//! Produces deterministic plans: same request, catalog and config give the
//! same plan.
//!
//! Decision order:
//! 1. One source serves every attribute: forward the request verbatim.
//! 2. Otherwise pick a driver owning filter, order-by and pagination;
//!    every other source enriches the driver's id set.
//! 3. No source can own every filter and order-by attribute: reject.
//!
//! The driver also owns group-by, so it must serve every group-by attribute
//! the catalog places on some source. A request whose group-by no driver
//! candidate serves is rejected.
//!
//! Driver and enrichment candidates are ranked by number of selection
//! attributes served, then configured preference, then source id.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{AttributeCatalog, AttributeId, RequestAttributeCache, SourceId};
use crate::context::ExecutionContext;
use crate::fetcher::DriverQuery;
use crate::observability::{log_event_with_fields, Event};
use crate::request::{QueryRequest, RequestContext};

use super::config::PlannerConfig;
use super::errors::{PlannerError, PlannerResult};
use super::plan::{EnrichmentPlan, ExecutionPlan, MultiSourcePlan, SingleSourcePlan};
use super::source_selection::{
    dedupe_selections_preferring, driver_sources, filters_fully_covered_by,
    single_source_for_all_attributes,
};

/// Planner over a read-only attribute catalog
pub struct QueryPlanner<'a, C: AttributeCatalog + ?Sized> {
    catalog: &'a C,
    config: &'a PlannerConfig,
}

impl<'a, C: AttributeCatalog + ?Sized> QueryPlanner<'a, C> {
    pub fn new(catalog: &'a C, config: &'a PlannerConfig) -> Self {
        Self { catalog, config }
    }

    /// Plans a request.
    ///
    /// Catalog answers are cached for this call only.
    pub fn plan(&self, ctx: &RequestContext, request: &QueryRequest) -> PlannerResult<ExecutionPlan> {
        let request_id = ctx.request_id_string();

        let result = self.plan_request(ctx, request);
        match &result {
            Ok(ExecutionPlan::SingleSource(plan)) => log_event_with_fields(
                Event::PlanSingleSource,
                &[("request_id", request_id.as_str()), ("source", plan.source.as_str())],
            ),
            Ok(ExecutionPlan::MultiSource(plan)) => {
                let enrichments = plan
                    .enrichments
                    .iter()
                    .map(|e| e.source.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                log_event_with_fields(
                    Event::PlanMultiSource,
                    &[
                        ("request_id", request_id.as_str()),
                        ("driver", plan.driver.as_str()),
                        ("enrichments", enrichments.as_str()),
                    ],
                );
            }
            Err(err) => log_event_with_fields(
                Event::PlanRejected,
                &[
                    ("request_id", request_id.as_str()),
                    ("code", err.code().code()),
                    ("reason", err.message()),
                ],
            ),
        }
        result
    }

    fn plan_request(&self, ctx: &RequestContext, request: &QueryRequest) -> PlannerResult<ExecutionPlan> {
        if request.entity_type.is_empty() {
            return Err(PlannerError::query_invalid("entity_type must not be empty"));
        }

        let mut cache = RequestAttributeCache::new(self.catalog, ctx);
        let id_attributes = self.resolve_id_attributes(&mut cache, &request.entity_type)?;
        let mut exec_ctx = ExecutionContext::build(request, id_attributes, &mut cache)?;

        let attribute_count = exec_ctx.all_attribute_to_sources().len().to_string();
        log_event_with_fields(
            Event::ContextBuilt,
            &[
                ("attributes", attribute_count.as_str()),
                ("request_id", ctx.request_id_string().as_str()),
            ],
        );

        self.plan_with_context(request, &mut exec_ctx)
    }

    /// Id attributes of the entity type. Keys the catalog does not know are
    /// skipped.
    fn resolve_id_attributes(
        &self,
        cache: &mut RequestAttributeCache<'_, C>,
        entity_type: &str,
    ) -> PlannerResult<Vec<AttributeId>> {
        let mut ids = Vec::new();
        for key in self.config.id_keys(entity_type) {
            if let Some(meta) = cache.resolve_key(entity_type, key)? {
                ids.push(meta.id);
            }
        }
        Ok(ids)
    }

    /// Plans against an already built context.
    ///
    /// Multi-source planning de-duplicates the context's selection buckets.
    pub fn plan_with_context(
        &self,
        request: &QueryRequest,
        ctx: &mut ExecutionContext,
    ) -> PlannerResult<ExecutionPlan> {
        if let Some(source) = single_source_for_all_attributes(ctx) {
            return Ok(ExecutionPlan::SingleSource(SingleSourcePlan {
                source,
                query: DriverQuery::from_request(request, ctx.id_attributes().to_vec()),
            }));
        }

        let driver = self.select_driver(ctx)?;
        Ok(ExecutionPlan::MultiSource(self.build_multi_source(request, ctx, driver)))
    }

    fn select_driver(&self, ctx: &ExecutionContext) -> PlannerResult<SourceId> {
        let mut candidates = driver_sources(ctx);
        if candidates.is_empty() {
            if ctx.has_driver_constraints() {
                return Err(PlannerError::no_driver_available(
                    "no single source serves every filter and order-by attribute",
                ));
            }
            candidates = ctx.fetchable_sources();
            candidates.extend(ctx.source_to_group_by_attributes().keys().cloned());
        }

        let ranked = self.rank(ctx, candidates);
        if ranked.is_empty() {
            return Err(PlannerError::no_driver_available(
                "no source can serve any requested attribute",
            ));
        }
        ranked
            .into_iter()
            .filter(|source| ctx.group_by_covered_by(source))
            .find(|source| filters_fully_covered_by(ctx, source))
            .ok_or_else(|| {
                PlannerError::no_driver_available(
                    "no driver candidate serves every filter and group-by attribute",
                )
            })
    }

    fn rank(&self, ctx: &ExecutionContext, sources: BTreeSet<SourceId>) -> Vec<SourceId> {
        let mut ranked: Vec<SourceId> = sources.into_iter().collect();
        ranked.sort_by(|a, b| {
            ctx.selection_count(b)
                .cmp(&ctx.selection_count(a))
                .then_with(|| {
                    self.config
                        .preference_rank(a)
                        .cmp(&self.config.preference_rank(b))
                })
                .then_with(|| a.cmp(b))
        });
        ranked
    }

    fn build_multi_source(
        &self,
        request: &QueryRequest,
        ctx: &mut ExecutionContext,
        driver: SourceId,
    ) -> MultiSourcePlan {
        dedupe_selections_preferring(ctx, &driver);

        let mut others = ctx.fetchable_sources();
        others.remove(&driver);
        let enrichment_order = self.rank(ctx, others);
        for source in &enrichment_order {
            dedupe_selections_preferring(ctx, source);
        }

        let remaining = ctx
            .source_to_selection_attributes()
            .values()
            .map(BTreeSet::len)
            .sum::<usize>()
            .to_string();
        log_event_with_fields(
            Event::SelectionsDeduplicated,
            &[("driver", driver.as_str()), ("remaining_selections", remaining.as_str())],
        );

        let selections_of = |source: &SourceId| {
            ctx.source_to_selection_expressions()
                .get(source)
                .cloned()
                .unwrap_or_default()
        };

        let mut driver_query = DriverQuery {
            entity_type: request.entity_type.clone(),
            id_attributes: ctx.id_attributes().to_vec(),
            time_range: request.time_range,
            selections: selections_of(&driver),
            metric_selections: Vec::new(),
            time_aggregations: Vec::new(),
            group_by: ctx
                .source_to_group_by_expressions()
                .get(&driver)
                .cloned()
                .unwrap_or_default(),
            filter: request.filter.clone(),
            order_by: request.order_by.clone(),
            pagination: request.pagination,
            include_total: request.include_total,
        };

        let mut enrichments: BTreeMap<SourceId, EnrichmentPlan> = enrichment_order
            .iter()
            .map(|source| {
                let mut plan = EnrichmentPlan::new(source.clone());
                plan.selections = selections_of(source);
                (source.clone(), plan)
            })
            .collect();

        let placement_order: Vec<&SourceId> = std::iter::once(&driver)
            .chain(enrichment_order.iter())
            .collect();

        for metric in &request.metric_selections {
            match place(ctx, &placement_order, metric.attribute_id()) {
                Some(source) if *source == driver => {
                    driver_query.metric_selections.push(metric.clone())
                }
                Some(source) => {
                    if let Some(plan) = enrichments.get_mut(source) {
                        plan.metric_selections.push(metric.clone());
                    }
                }
                None => {}
            }
        }

        for aggregation in &request.time_aggregations {
            match place(ctx, &placement_order, aggregation.attribute_id()) {
                Some(source) if *source == driver => {
                    driver_query.time_aggregations.push(aggregation.clone())
                }
                Some(source) => {
                    if let Some(plan) = enrichments.get_mut(source) {
                        plan.time_aggregations.push(aggregation.clone());
                    }
                }
                None => {}
            }
        }

        let enrichments = enrichment_order
            .iter()
            .filter_map(|source| enrichments.remove(source))
            .filter(|plan| !plan.is_empty())
            .collect();

        MultiSourcePlan {
            driver,
            driver_query,
            enrichments,
        }
    }
}

/// First source in `order` capable of serving `attribute`
fn place<'s>(
    ctx: &ExecutionContext,
    order: &[&'s SourceId],
    attribute: &AttributeId,
) -> Option<&'s SourceId> {
    let capable = ctx.all_attribute_to_sources().get(attribute)?;
    order.iter().copied().find(|source| capable.contains(*source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::planner::errors::PlannerErrorCode;
    use crate::request::{Expression, FilterNode, FunctionType, OrderByExpression, TimeAggregation};
    use serde_json::json;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_attribute("API", "id", ["QS", "EDS", "AS"])
            .with_attribute("API", "name", ["QS", "EDS"])
            .with_attribute("API", "status", ["QS"])
            .with_attribute("API", "latency", ["QS", "AS"])
            .with_attribute("API", "owner", ["EDS"])
            .with_attribute("API", "tier", ["EDS", "AS"])
            .with_attribute("API", "calls", ["AS"])
    }

    fn config() -> PlannerConfig {
        PlannerConfig::default()
            .with_source_preference(["QS", "EDS", "AS"])
            .with_entity_id_columns("API", ["id", "missing"])
    }

    fn src(s: &str) -> SourceId {
        SourceId::new(s)
    }

    fn names(expressions: &[Expression]) -> Vec<&str> {
        expressions.iter().map(|e| e.result_name()).collect()
    }

    #[test]
    fn test_single_source_forwards_request() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .select("API.status")
            .with_filter(FilterNode::eq("API.status", json!("UP")))
            .with_pagination(10, 0);

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        assert!(plan.is_single_source());
        assert_eq!(plan.driver(), &src("QS"));
        assert_eq!(plan.driver_query().selections, request.selections);
        assert_eq!(plan.driver_query().filter, request.filter);
        assert_eq!(plan.driver_query().id_attributes, vec![AttributeId::new("API.id")]);
    }

    #[test]
    fn test_multi_source_driver_owns_filter_and_order() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .select("API.owner")
            .with_filter(FilterNode::eq("API.status", json!("UP")))
            .with_order_by(OrderByExpression::desc(Expression::column("API.latency")))
            .with_pagination(20, 40);

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        let ExecutionPlan::MultiSource(plan) = plan else {
            panic!("expected a multi-source plan");
        };
        assert_eq!(plan.driver, src("QS"));
        assert_eq!(names(&plan.driver_query.selections), vec!["API.name"]);
        assert_eq!(plan.driver_query.filter, request.filter);
        assert_eq!(plan.driver_query.order_by, request.order_by);
        assert_eq!(plan.driver_query.pagination, request.pagination);

        assert_eq!(plan.enrichments.len(), 1);
        assert_eq!(plan.enrichments[0].source, src("EDS"));
        assert_eq!(names(&plan.enrichments[0].selections), vec!["API.owner"]);
    }

    #[test]
    fn test_each_selection_fetched_once() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .select("API.owner")
            .select("API.tier")
            .select("API.calls")
            .with_filter(FilterNode::eq("API.status", json!("UP")));

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        let mut fetched: Vec<&str> = names(&plan.driver_query().selections);
        for enrichment in plan.enrichments() {
            fetched.extend(names(&enrichment.selections));
        }
        fetched.sort();
        assert_eq!(fetched, vec!["API.calls", "API.name", "API.owner", "API.tier"]);

        let sources: Vec<&str> = plan.sources().iter().map(|s| s.as_str()).collect();
        assert_eq!(sources, vec!["QS", "EDS", "AS"]);
        // EDS ranks ahead of AS and keeps the shared tier column
        assert_eq!(names(&plan.enrichments()[0].selections), vec!["API.owner", "API.tier"]);
        assert_eq!(names(&plan.enrichments()[1].selections), vec!["API.calls"]);
    }

    #[test]
    fn test_split_constraints_rejected() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .with_filter(FilterNode::eq("API.status", json!("UP")))
            .with_order_by(OrderByExpression::asc(Expression::column("API.owner")));

        let err = planner.plan(&RequestContext::new("t"), &request).unwrap_err();

        assert_eq!(err.code(), PlannerErrorCode::NoDriverAvailable);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_group_by_outside_driver_candidates_rejected() {
        let catalog = catalog().with_attribute("API", "region", ["EDS"]);
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .with_group_by(Expression::column("API.region"))
            .with_filter(FilterNode::eq("API.status", json!("UP")));

        let err = planner.plan(&RequestContext::new("t"), &request).unwrap_err();

        assert_eq!(err.code(), PlannerErrorCode::NoDriverAvailable);
        assert!(err.message().contains("group-by"));
    }

    #[test]
    fn test_group_by_steers_driver_choice() {
        let catalog = catalog().with_attribute("API", "region", ["EDS"]);
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.status")
            .select("API.owner")
            .with_group_by(Expression::column("API.region"))
            .with_group_by(Expression::column("API.ghost"))
            .with_filter(FilterNode::eq("API.id", json!("a")));

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        // QS wins on preference but cannot group by region
        assert_eq!(plan.driver(), &src("EDS"));
        assert_eq!(names(&plan.driver_query().group_by), vec!["API.region"]);
        assert_eq!(names(&plan.driver_query().selections), vec!["API.owner"]);
        assert_eq!(plan.enrichments().len(), 1);
        assert_eq!(plan.enrichments()[0].source, src("QS"));
        assert_eq!(names(&plan.enrichments()[0].selections), vec!["API.status"]);
    }

    #[test]
    fn test_unconstrained_group_by_source_may_drive() {
        let catalog = catalog().with_attribute("API", "region", ["EDS"]);
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.status")
            .with_group_by(Expression::column("API.region"));

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        assert_eq!(plan.driver(), &src("EDS"));
        assert!(plan.driver_query().selections.is_empty());
        assert_eq!(names(&plan.driver_query().group_by), vec!["API.region"]);
        assert_eq!(names(&plan.enrichments()[0].selections), vec!["API.status"]);
    }

    #[test]
    fn test_unconstrained_driver_serves_most_selections() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.owner")
            .select("API.tier")
            .select("API.calls");

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        assert_eq!(plan.driver(), &src("EDS"));
        assert_eq!(names(&plan.driver_query().selections), vec!["API.owner", "API.tier"]);
        assert_eq!(plan.enrichments().len(), 1);
        assert_eq!(names(&plan.enrichments()[0].selections), vec!["API.calls"]);
    }

    #[test]
    fn test_metric_placed_on_driver_when_capable() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.owner")
            .with_filter(FilterNode::eq("API.status", json!("UP")))
            .with_metric(Expression::function(FunctionType::Avg, "API.latency", "avg_latency"))
            .with_metric(Expression::function(FunctionType::Sum, "API.calls", "calls"))
            .with_time_aggregation(TimeAggregation::new(
                60,
                Expression::function(FunctionType::Sum, "API.calls", "calls_per_minute"),
            ));

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        assert_eq!(plan.driver(), &src("QS"));
        assert_eq!(names(&plan.driver_query().metric_selections), vec!["avg_latency"]);
        let by_source: BTreeMap<&str, &EnrichmentPlan> = plan
            .enrichments()
            .iter()
            .map(|e| (e.source.as_str(), e))
            .collect();
        assert_eq!(names(&by_source["AS"].metric_selections), vec!["calls"]);
        assert_eq!(by_source["AS"].time_aggregations.len(), 1);
        assert_eq!(names(&by_source["EDS"].selections), vec!["API.owner"]);
    }

    #[test]
    fn test_unknown_attribute_never_fetched() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.owner")
            .select("API.calls")
            .select("API.ghost");

        let plan = planner.plan(&RequestContext::new("t"), &request).unwrap();

        let mut fetched: Vec<&str> = names(&plan.driver_query().selections);
        for enrichment in plan.enrichments() {
            fetched.extend(names(&enrichment.selections));
        }
        assert!(!fetched.contains(&"API.ghost"));
    }

    #[test]
    fn test_empty_entity_type_invalid() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);

        let err = planner
            .plan(&RequestContext::new("t"), &QueryRequest::new(""))
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::QueryInvalid);
    }

    #[test]
    fn test_catalog_failure_is_retryable() {
        let catalog = catalog().unavailable("connection reset");
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);

        let err = planner
            .plan(&RequestContext::new("t"), &QueryRequest::new("API").select("API.name"))
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::CatalogUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_plan_deterministic() {
        let catalog = catalog();
        let config = config();
        let planner = QueryPlanner::new(&catalog, &config);
        let request = QueryRequest::new("API")
            .select("API.name")
            .select("API.tier")
            .select("API.calls")
            .with_filter(FilterNode::eq("API.id", json!("a")));

        let first = planner.plan(&RequestContext::new("t"), &request).unwrap();
        let second = planner.plan(&RequestContext::new("t"), &request).unwrap();
        assert_eq!(first, second);
    }
}
