//! Observability for the gateway core
//!
//! Structured JSON logging and lifecycle event tracing. Observability is
//! read-only: it never changes planning or fetch results.
//!
//! ```ignore
//! use fedgate::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::PlanSingleSource, &[("source", "QS")]);
//!
//! let scope = ObservationScope::with_fields("QUERY", &[("request_id", "...")]);
//! scope.complete();
//! ```

mod config;
mod events;
mod logger;
mod scope;

pub use config::LoggingConfig;
pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded);
        log_event(Event::MergeComplete);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::PlanMultiSource, &[("driver", "QS"), ("enrichments", "1")]);
    }
}
