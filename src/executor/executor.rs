//! Plan executor
//!
//! Runs a plan against the registered fetchers:
//! 1. Every planned source must have a fetcher, checked before any fetch.
//! 2. The driver page (and total, if requested) is fetched first.
//! 3. Enrichment fetches for the driver's ids run concurrently.
//! 4. Rows are merged in driver order.
//!
//! Every fetch is bounded by the configured timeout. A timeout counts as a
//! fetch failure. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join, join_all};

use crate::catalog::SourceId;
use crate::fetcher::{
    DriverQuery, EnrichmentQuery, FetchError, FetchFuture, FetchResult, FetcherRegistry, RowSet,
    SourceFetcher,
};
use crate::observability::{log_event_with_fields, Event};
use crate::planner::{EnrichmentPlan, ExecutionPlan};
use crate::request::RequestContext;

use super::config::{EnrichmentFailurePolicy, ExecutorConfig};
use super::errors::{ExecutorError, ExecutorResult};
use super::merger::{FetchResults, ResultMerger};
use super::result::QueryResult;

/// Executes plans against source fetchers
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    registry: FetcherRegistry,
    config: ExecutorConfig,
}

impl PlanExecutor {
    pub fn new(registry: FetcherRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes a plan and merges the results
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        plan: &ExecutionPlan,
    ) -> ExecutorResult<QueryResult> {
        let request_id = ctx.request_id_string();

        let driver = self.fetcher(plan.driver())?;
        let enrichment_fetchers = plan
            .enrichments()
            .iter()
            .map(|enrichment| self.fetcher(&enrichment.source).map(|fetcher| (enrichment, fetcher)))
            .collect::<ExecutorResult<Vec<_>>>()?;

        let query = plan.driver_query();
        let (driver_rows, total) = self
            .fetch_driver(ctx, driver.as_ref(), query)
            .await
            .map_err(|err| {
                log_fetch_failed(&request_id, &err);
                ExecutorError::driver_fetch_failed(err)
            })?;

        let row_count = driver_rows.len().to_string();
        log_event_with_fields(
            Event::DriverFetched,
            &[
                ("request_id", request_id.as_str()),
                ("rows", row_count.as_str()),
                ("source", plan.driver().as_str()),
            ],
        );

        let mut results = FetchResults::new(driver_rows);
        let mut degraded_sources = Vec::new();

        // An empty page leaves nothing to enrich
        if !results.driver.is_empty() && !enrichment_fetchers.is_empty() {
            let ids = results.driver.ids();
            let queries: Vec<EnrichmentQuery> = enrichment_fetchers
                .iter()
                .map(|(enrichment, _)| enrichment.to_query(query, ids.clone()))
                .collect();

            let outcomes = join_all(enrichment_fetchers.iter().zip(queries.iter()).map(
                |((_, fetcher), enrichment_query)| {
                    self.with_timeout(
                        fetcher.source(),
                        fetcher.fetch_rows_for_ids(ctx, enrichment_query),
                    )
                },
            ))
            .await;

            for ((enrichment, _), outcome) in enrichment_fetchers.iter().zip(outcomes) {
                match outcome {
                    Ok(rows) => {
                        let row_count = rows.len().to_string();
                        log_event_with_fields(
                            Event::EnrichmentFetched,
                            &[
                                ("request_id", request_id.as_str()),
                                ("rows", row_count.as_str()),
                                ("source", enrichment.source.as_str()),
                            ],
                        );
                        results.enrichments.insert(enrichment.source.clone(), rows);
                    }
                    Err(err) => {
                        self.on_enrichment_failure(&request_id, enrichment, err)?;
                        degraded_sources.push(enrichment.source.clone());
                    }
                }
            }
        }

        let rows = ResultMerger::merge(plan, results);

        let merged_count = rows.len().to_string();
        log_event_with_fields(
            Event::MergeComplete,
            &[
                ("degraded", if degraded_sources.is_empty() { "false" } else { "true" }),
                ("request_id", request_id.as_str()),
                ("rows", merged_count.as_str()),
            ],
        );

        Ok(QueryResult {
            rows,
            total,
            degraded_sources,
        })
    }

    fn fetcher(&self, source: &SourceId) -> ExecutorResult<Arc<dyn SourceFetcher>> {
        self.registry
            .get(source)
            .ok_or_else(|| ExecutorError::unknown_source(source))
    }

    /// Driver page and, if requested, the total count, fetched concurrently.
    /// A source without total support yields no total instead of an error.
    async fn fetch_driver(
        &self,
        ctx: &RequestContext,
        fetcher: &dyn SourceFetcher,
        query: &DriverQuery,
    ) -> FetchResult<(RowSet, Option<u64>)> {
        let source = fetcher.source();
        if !query.include_total {
            let rows = self.with_timeout(source, fetcher.fetch_rows(ctx, query)).await?;
            return Ok((rows, None));
        }

        let (rows, total) = join(
            self.with_timeout(source, fetcher.fetch_rows(ctx, query)),
            self.with_timeout(source, fetcher.fetch_total(ctx, query)),
        )
        .await;

        let total = match total {
            Ok(total) => Some(total),
            Err(FetchError::Unsupported { .. }) => None,
            Err(err) => return Err(err),
        };
        Ok((rows?, total))
    }

    /// Applies the enrichment failure policy. Returns an error only under
    /// `FailRequest`.
    fn on_enrichment_failure(
        &self,
        request_id: &str,
        enrichment: &EnrichmentPlan,
        err: FetchError,
    ) -> ExecutorResult<()> {
        match self.config.enrichment_failure_policy {
            EnrichmentFailurePolicy::FailRequest => {
                log_fetch_failed(request_id, &err);
                Err(ExecutorError::enrichment_fetch_failed(err))
            }
            EnrichmentFailurePolicy::DropColumns => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::EnrichmentDegraded,
                    &[
                        ("kind", err.kind()),
                        ("reason", reason.as_str()),
                        ("request_id", request_id),
                        ("source", enrichment.source.as_str()),
                    ],
                );
                Ok(())
            }
        }
    }

    async fn with_timeout<T>(&self, source: &SourceId, fetch: FetchFuture<'_, T>) -> FetchResult<T> {
        let timeout_ms = self.config.fetch_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(source.clone(), timeout_ms)),
        }
    }
}

fn log_fetch_failed(request_id: &str, err: &FetchError) {
    let reason = err.to_string();
    log_event_with_fields(
        Event::FetchFailed,
        &[
            ("kind", err.kind()),
            ("reason", reason.as_str()),
            ("request_id", request_id),
            ("source", err.source_id().as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::EntityRow;
    use crate::planner::{MultiSourcePlan, SingleSourcePlan};
    use crate::request::{Expression, QueryRequest};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed page; enrichment answers with one column per id
    struct FixedFetcher {
        source: SourceId,
        column: &'static str,
        ids: Vec<&'static str>,
        fail: bool,
        enrichment_calls: AtomicUsize,
    }

    impl FixedFetcher {
        fn new(source: &str, column: &'static str, ids: Vec<&'static str>) -> Self {
            Self {
                source: SourceId::new(source),
                column,
                ids,
                fail: false,
                enrichment_calls: AtomicUsize::new(0),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl SourceFetcher for FixedFetcher {
        fn source(&self) -> &SourceId {
            &self.source
        }

        fn fetch_rows<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _query: &'a DriverQuery,
        ) -> FetchFuture<'a, RowSet> {
            Box::pin(async move {
                if self.fail {
                    return Err(FetchError::backend(self.source.clone(), "boom"));
                }
                Ok(RowSet::new(
                    self.ids
                        .iter()
                        .map(|id| EntityRow::new(*id).with(self.column, json!(id)))
                        .collect(),
                ))
            })
        }

        fn fetch_rows_for_ids<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            query: &'a EnrichmentQuery,
        ) -> FetchFuture<'a, RowSet> {
            self.enrichment_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if self.fail {
                    return Err(FetchError::transport(self.source.clone(), "refused"));
                }
                Ok(RowSet::new(
                    query
                        .entity_ids
                        .iter()
                        .map(|id| EntityRow::new(id.clone()).with(self.column, json!(id.as_str())))
                        .collect(),
                ))
            })
        }
    }

    fn plan() -> ExecutionPlan {
        let mut enrichment = EnrichmentPlan::new(SourceId::new("EDS"));
        enrichment.selections.push(Expression::column("API.owner"));
        ExecutionPlan::MultiSource(MultiSourcePlan {
            driver: SourceId::new("QS"),
            driver_query: DriverQuery::from_request(&QueryRequest::new("API"), vec![]),
            enrichments: vec![enrichment],
        })
    }

    #[tokio::test]
    async fn test_multi_source_merge() {
        let registry = FetcherRegistry::new()
            .with(FixedFetcher::new("QS", "API.name", vec!["b", "a"]))
            .with(FixedFetcher::new("EDS", "API.owner", vec![]));
        let executor = PlanExecutor::new(registry, ExecutorConfig::default());

        let result = executor.execute(&RequestContext::new("t"), &plan()).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.rows[0].id.as_str(), "b");
        assert_eq!(result.rows[0].get("API.owner"), Some(&json!("b")));
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn test_unknown_source_fails_before_fetching() {
        let registry = FetcherRegistry::new().with(FixedFetcher::new("QS", "API.name", vec!["a"]));
        let executor = PlanExecutor::new(registry, ExecutorConfig::default());

        let err = executor
            .execute(&RequestContext::new("t"), &plan())
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::executor::ExecutorErrorCode::UnknownSource);
    }

    #[tokio::test]
    async fn test_empty_driver_page_skips_enrichment() {
        let enrichment = Arc::new(FixedFetcher::new("EDS", "API.owner", vec![]));
        let mut registry = FetcherRegistry::new().with(FixedFetcher::new("QS", "API.name", vec![]));
        registry.register_arc(enrichment.clone());
        let executor = PlanExecutor::new(registry, ExecutorConfig::default());

        let result = executor.execute(&RequestContext::new("t"), &plan()).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(enrichment.enrichment_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_columns_policy() {
        let registry = FetcherRegistry::new()
            .with(FixedFetcher::new("QS", "API.name", vec!["a"]))
            .with(FixedFetcher::new("EDS", "API.owner", vec![]).failing());
        let config = ExecutorConfig::default().with_policy(EnrichmentFailurePolicy::DropColumns);
        let executor = PlanExecutor::new(registry, config);

        let result = executor.execute(&RequestContext::new("t"), &plan()).await.unwrap();

        assert_eq!(result.degraded_sources, vec![SourceId::new("EDS")]);
        assert_eq!(result.rows[0].get("API.owner"), Some(&serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_single_source_total_unsupported_is_none() {
        let registry = FetcherRegistry::new().with(FixedFetcher::new("QS", "API.name", vec!["a"]));
        let executor = PlanExecutor::new(registry, ExecutorConfig::default());
        let request = QueryRequest::new("API").with_total();
        let plan = ExecutionPlan::SingleSource(SingleSourcePlan {
            source: SourceId::new("QS"),
            query: DriverQuery::from_request(&request, vec![]),
        });

        let result = executor.execute(&RequestContext::new("t"), &plan).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.total, None);
    }
}
