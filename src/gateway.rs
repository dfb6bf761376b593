//! Gateway facade
//!
//! Plans a request against the catalog, executes the plan against the
//! registered fetchers and returns merged rows.

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::AttributeCatalog;
use crate::config::GatewayConfig;
use crate::executor::{ExecutorError, PlanExecutor, QueryResult};
use crate::fetcher::FetcherRegistry;
use crate::observability::ObservationScope;
use crate::planner::{ExecutionPlan, ExplainPlan, PlannerConfig, PlannerError, PlannerResult, QueryPlanner};
use crate::request::{QueryRequest, RequestContext};

/// Any failure of one gateway request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl GatewayError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Planner(err) => err.code().code(),
            GatewayError::Executor(err) => err.code().code(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayError::Planner(err) => err.message(),
            GatewayError::Executor(err) => err.message(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Planner(err) => err.is_retryable(),
            GatewayError::Executor(err) => err.is_retryable(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Federated query gateway
pub struct Gateway {
    catalog: Arc<dyn AttributeCatalog>,
    planner_config: PlannerConfig,
    executor: PlanExecutor,
}

impl Gateway {
    /// Builds a gateway. Installs the configured log threshold for the
    /// whole process.
    pub fn new(
        catalog: Arc<dyn AttributeCatalog>,
        registry: FetcherRegistry,
        config: GatewayConfig,
    ) -> Self {
        config.logging.apply();
        Self {
            catalog,
            planner_config: config.planner,
            executor: PlanExecutor::new(registry, config.executor),
        }
    }

    /// Plans a request without fetching anything
    pub fn plan(&self, ctx: &RequestContext, request: &QueryRequest) -> PlannerResult<ExecutionPlan> {
        QueryPlanner::new(self.catalog.as_ref(), &self.planner_config).plan(ctx, request)
    }

    /// Explain output for a request, accepted or rejected
    pub fn explain(&self, ctx: &RequestContext, request: &QueryRequest) -> ExplainPlan {
        match self.plan(ctx, request) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        }
    }

    /// Plans, fetches and merges one request
    pub async fn query(
        &self,
        ctx: &RequestContext,
        request: &QueryRequest,
    ) -> GatewayResult<QueryResult> {
        let request_id = ctx.request_id_string();
        let scope = ObservationScope::with_fields(
            "QUERY",
            &[
                ("entity_type", request.entity_type.as_str()),
                ("request_id", request_id.as_str()),
            ],
        );

        let plan = match self.plan(ctx, request) {
            Ok(plan) => plan,
            Err(err) => {
                scope.fail(err.code().code(), err.message());
                return Err(err.into());
            }
        };

        match self.executor.execute(ctx, &plan).await {
            Ok(result) => {
                let rows = result.len().to_string();
                scope.complete_with_fields(&[("driver", plan.driver().as_str()), ("rows", rows.as_str())]);
                Ok(result)
            }
            Err(err) => {
                scope.fail(err.code().code(), err.message());
                Err(err.into())
            }
        }
    }
}
