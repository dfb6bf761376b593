//! Result merger
//!
//! Stitches enrichment columns onto the driver's rows. The driver's row
//! order and page are final: enrichment results never add, drop or reorder
//! rows.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::catalog::SourceId;
use crate::fetcher::{EntityId, EntityRow, RowSet};
use crate::planner::ExecutionPlan;

/// Raw fetch output of one plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResults {
    pub driver: RowSet,
    /// Enrichment rows by source. A planned source missing here had its
    /// columns dropped.
    pub enrichments: BTreeMap<SourceId, RowSet>,
}

impl FetchResults {
    pub fn new(driver: RowSet) -> Self {
        Self {
            driver,
            enrichments: BTreeMap::new(),
        }
    }

    pub fn with_enrichment(mut self, source: impl Into<SourceId>, rows: RowSet) -> Self {
        self.enrichments.insert(source.into(), rows);
        self
    }
}

/// Merges per-source results into final rows
pub struct ResultMerger;

impl ResultMerger {
    /// For each driver row, in order, overlays the expected columns of every
    /// enrichment source. A column the source did not return for that id is
    /// set to null. Enrichment rows for ids the driver did not return are
    /// ignored.
    pub fn merge(plan: &ExecutionPlan, results: FetchResults) -> Vec<EntityRow> {
        let FetchResults {
            driver,
            enrichments,
        } = results;

        if plan.enrichments().is_empty() {
            return driver.rows;
        }

        let overlays: Vec<(Vec<&str>, HashMap<&EntityId, &EntityRow>)> = plan
            .enrichments()
            .iter()
            .map(|enrichment| {
                let index = enrichments
                    .get(&enrichment.source)
                    .map(RowSet::index_by_id)
                    .unwrap_or_default();
                (enrichment.expected_columns(), index)
            })
            .collect();

        driver
            .into_iter()
            .map(|mut row| {
                for (columns, index) in &overlays {
                    let matched = index.get(&row.id).copied();
                    for column in columns {
                        let value = matched
                            .and_then(|r| r.get(column))
                            .cloned()
                            .unwrap_or(Value::Null);
                        row.set(*column, value);
                    }
                }
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::DriverQuery;
    use crate::planner::{EnrichmentPlan, MultiSourcePlan, SingleSourcePlan};
    use crate::request::{Expression, QueryRequest};
    use serde_json::json;

    fn driver_rows() -> RowSet {
        RowSet::new(vec![
            EntityRow::new("b").with("API.name", json!("beta")),
            EntityRow::new("a").with("API.name", json!("alpha")),
            EntityRow::new("c").with("API.name", json!("gamma")),
        ])
    }

    fn multi_source_plan() -> ExecutionPlan {
        let mut enrichment = EnrichmentPlan::new(SourceId::new("EDS"));
        enrichment.selections.push(Expression::column("API.owner"));
        ExecutionPlan::MultiSource(MultiSourcePlan {
            driver: SourceId::new("QS"),
            driver_query: DriverQuery::from_request(&QueryRequest::new("API"), vec![]),
            enrichments: vec![enrichment],
        })
    }

    #[test]
    fn test_no_enrichments_returns_driver_rows() {
        let plan = ExecutionPlan::SingleSource(SingleSourcePlan {
            source: SourceId::new("QS"),
            query: DriverQuery::from_request(&QueryRequest::new("API"), vec![]),
        });

        let merged = ResultMerger::merge(&plan, FetchResults::new(driver_rows()));

        assert_eq!(merged, driver_rows().rows);
    }

    #[test]
    fn test_overlay_keeps_driver_order() {
        let enrichment = RowSet::new(vec![
            EntityRow::new("a").with("API.owner", json!("ann")),
            EntityRow::new("b").with("API.owner", json!("bob")),
            EntityRow::new("c").with("API.owner", json!("cid")),
        ]);

        let merged = ResultMerger::merge(
            &multi_source_plan(),
            FetchResults::new(driver_rows()).with_enrichment("EDS", enrichment),
        );

        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(merged[0].get("API.owner"), Some(&json!("bob")));
        assert_eq!(merged[0].get("API.name"), Some(&json!("beta")));
    }

    #[test]
    fn test_missing_id_yields_null() {
        let enrichment = RowSet::new(vec![
            EntityRow::new("a").with("API.owner", json!("ann")),
            EntityRow::new("zzz").with("API.owner", json!("ghost")),
        ]);

        let merged = ResultMerger::merge(
            &multi_source_plan(),
            FetchResults::new(driver_rows()).with_enrichment("EDS", enrichment),
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].get("API.owner"), Some(&Value::Null));
        assert_eq!(merged[1].get("API.owner"), Some(&json!("ann")));
        assert!(merged.iter().all(|r| r.id.as_str() != "zzz"));
    }

    #[test]
    fn test_dropped_source_yields_null_columns() {
        let merged = ResultMerger::merge(&multi_source_plan(), FetchResults::new(driver_rows()));

        assert!(merged
            .iter()
            .all(|r| r.get("API.owner") == Some(&Value::Null)));
    }
}
