//! Explain output
//!
//! Deterministic, human-readable rendering of a plan or a rejection.

use std::fmt;

use crate::fetcher::DriverQuery;
use crate::request::FilterNode;

use super::errors::PlannerError;
use super::plan::ExecutionPlan;

/// One enrichment fetch in explain output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainEnrichment {
    pub source: String,
    pub columns: Vec<String>,
}

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// `SINGLE_SOURCE` or `MULTI_SOURCE`
    pub mode: Option<&'static str>,
    /// Source owning filter, order and pagination
    pub driver: Option<String>,
    /// Columns fetched from the driver
    pub driver_columns: Vec<String>,
    /// Filter leaves, depth first
    pub predicates: Vec<String>,
    pub sort: Vec<String>,
    /// `None` when the request is not paginated
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub enrichments: Vec<ExplainEnrichment>,
    pub rejection_reason: Option<String>,
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from an accepted plan
    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        let query = plan.driver_query();
        let mode = if plan.is_single_source() {
            "SINGLE_SOURCE"
        } else {
            "MULTI_SOURCE"
        };

        let enrichments = plan
            .enrichments()
            .iter()
            .map(|e| ExplainEnrichment {
                source: e.source.to_string(),
                columns: e.expected_columns().into_iter().map(String::from).collect(),
            })
            .collect();

        Self {
            accepted: true,
            mode: Some(mode),
            driver: Some(plan.driver().to_string()),
            driver_columns: driver_columns(query),
            predicates: query.filter.as_ref().map(predicates).unwrap_or_default(),
            sort: query
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.expression.result_name(), o.order.as_str()))
                .collect(),
            limit: query.pagination.is_paginated().then_some(query.pagination.limit),
            offset: query.pagination.is_paginated().then_some(query.pagination.offset),
            enrichments,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            mode: None,
            driver: None,
            driver_columns: Vec::new(),
            predicates: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            enrichments: Vec::new(),
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

fn driver_columns(query: &DriverQuery) -> Vec<String> {
    query
        .result_columns()
        .into_iter()
        .map(String::from)
        .collect()
}

fn predicates(filter: &FilterNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_predicates(filter, &mut out);
    out
}

fn collect_predicates(filter: &FilterNode, out: &mut Vec<String>) {
    match filter {
        FilterNode::And(children) | FilterNode::Or(children) => {
            for child in children {
                collect_predicates(child, out);
            }
        }
        FilterNode::Leaf { lhs, op, value } => {
            out.push(format!("{} {} {}", lhs.result_name(), op.as_str(), value));
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(mode) = self.mode {
                writeln!(f, "Mode: {}", mode)?;
            }
            if let Some(driver) = &self.driver {
                writeln!(f, "Driver: {}", driver)?;
            }
            if !self.driver_columns.is_empty() {
                writeln!(f, "Driver Columns: {}", self.driver_columns.join(", "))?;
            }
            if !self.predicates.is_empty() {
                writeln!(f, "Predicates:")?;
                for pred in &self.predicates {
                    writeln!(f, "  - {}", pred)?;
                }
            }
            if !self.sort.is_empty() {
                writeln!(f, "Sort: {}", self.sort.join(", "))?;
            }
            match (self.limit, self.offset) {
                (Some(limit), Some(offset)) => writeln!(f, "Page: limit {} offset {}", limit, offset)?,
                _ => writeln!(f, "Page: unpaginated")?,
            }
            for enrichment in &self.enrichments {
                writeln!(
                    f,
                    "Enrich: {} [{}]",
                    enrichment.source,
                    enrichment.columns.join(", ")
                )?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
