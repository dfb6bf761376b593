//! Observable gateway events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events emitted while planning and executing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,

    // Planning
    /// Execution context built from the request and catalog answers
    ContextBuilt,
    /// Whole request pushed down to one source
    PlanSingleSource,
    /// Driver chosen, enrichments attached
    PlanMultiSource,
    /// Redundant selection fetches removed from a source
    SelectionsDeduplicated,
    /// No source can own filter and order-by
    PlanRejected,

    // Execution
    /// Driver fetch returned its page
    DriverFetched,
    /// Enrichment fetch returned rows
    EnrichmentFetched,
    /// Enrichment failed and its columns were dropped
    EnrichmentDegraded,
    /// A fetch failed and the request fails with it
    FetchFailed,
    /// Final rows stitched together
    MergeComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ContextBuilt => "EXECUTION_CONTEXT_BUILT",
            Event::PlanSingleSource => "PLAN_SINGLE_SOURCE",
            Event::PlanMultiSource => "PLAN_MULTI_SOURCE",
            Event::SelectionsDeduplicated => "SELECTIONS_DEDUPLICATED",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::DriverFetched => "DRIVER_FETCHED",
            Event::EnrichmentFetched => "ENRICHMENT_FETCHED",
            Event::EnrichmentDegraded => "ENRICHMENT_DEGRADED",
            Event::FetchFailed => "FETCH_FAILED",
            Event::MergeComplete => "MERGE_COMPLETE",
        }
    }

    /// Returns the severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ContextBuilt | Event::SelectionsDeduplicated => Severity::Trace,
            Event::EnrichmentDegraded | Event::PlanRejected => Severity::Warn,
            Event::FetchFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::ContextBuilt,
            Event::PlanSingleSource,
            Event::PlanMultiSource,
            Event::SelectionsDeduplicated,
            Event::PlanRejected,
            Event::DriverFetched,
            Event::EnrichmentFetched,
            Event::EnrichmentDegraded,
            Event::FetchFailed,
            Event::MergeComplete,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::FetchFailed.severity(), Severity::Error);
        assert_eq!(Event::EnrichmentDegraded.severity(), Severity::Warn);
        assert_eq!(Event::PlanMultiSource.severity(), Severity::Info);
    }
}
