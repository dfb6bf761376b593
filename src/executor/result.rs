//! Result types for plan execution

use serde::Serialize;

use crate::catalog::SourceId;
use crate::fetcher::EntityRow;

/// Merged answer to one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Rows in driver order
    pub rows: Vec<EntityRow>,
    /// Total matching entities, when requested and reported by the driver
    pub total: Option<u64>,
    /// Enrichment sources whose columns were dropped after a failure
    pub degraded_sources: Vec<SourceId>,
}

impl QueryResult {
    pub fn new(rows: Vec<EntityRow>) -> Self {
        Self {
            rows,
            total: None,
            degraded_sources: Vec::new(),
        }
    }

    /// Returns true if no rows matched
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRow> {
        self.rows.iter()
    }

    /// True if at least one enrichment source was dropped
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let result = QueryResult::new(Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert!(!result.is_degraded());
        assert!(result.total.is_none());
    }
}
