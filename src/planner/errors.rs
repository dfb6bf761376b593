//! Planner error types
//!
//! Error codes:
//! - FEDGATE_NO_DRIVER_AVAILABLE (REJECT)
//! - FEDGATE_CATALOG_UNAVAILABLE (ERROR, retryable)
//! - FEDGATE_QUERY_INVALID (REJECT)

use std::fmt;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Dependency failed while planning
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// No source can own filter, order and pagination
    NoDriverAvailable,
    /// Catalog lookup failed
    CatalogUnavailable,
    /// Request unusable as given
    QueryInvalid,
}

impl PlannerErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::NoDriverAvailable => "FEDGATE_NO_DRIVER_AVAILABLE",
            PlannerErrorCode::CatalogUnavailable => "FEDGATE_CATALOG_UNAVAILABLE",
            PlannerErrorCode::QueryInvalid => "FEDGATE_QUERY_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::CatalogUnavailable => Severity::Error,
            _ => Severity::Reject,
        }
    }

    /// Whether the same request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlannerErrorCode::CatalogUnavailable)
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error with code and message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{}] {}: {}", .code.severity(), .code.code(), .message)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
}

impl PlannerError {
    pub fn no_driver_available(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::NoDriverAvailable,
            message: reason.into(),
        }
    }

    pub fn catalog_unavailable(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::CatalogUnavailable,
            message: reason.into(),
        }
    }

    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::QueryInvalid,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CatalogError> for PlannerError {
    fn from(err: CatalogError) -> Self {
        PlannerError::catalog_unavailable(err.to_string())
    }
}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::NoDriverAvailable.code(),
            "FEDGATE_NO_DRIVER_AVAILABLE"
        );
        assert_eq!(
            PlannerErrorCode::CatalogUnavailable.code(),
            "FEDGATE_CATALOG_UNAVAILABLE"
        );
        assert_eq!(PlannerErrorCode::QueryInvalid.code(), "FEDGATE_QUERY_INVALID");
    }

    #[test]
    fn test_no_driver_is_not_retryable() {
        let err = PlannerError::no_driver_available("filter split across sources");
        assert_eq!(err.severity(), Severity::Reject);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: PlannerError = CatalogError::unavailable("timeout").into();
        assert_eq!(err.code(), PlannerErrorCode::CatalogUnavailable);
        assert!(err.is_retryable());
        assert!(err.message().contains("timeout"));
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::no_driver_available("no common source");
        let display = err.to_string();
        assert_eq!(
            display,
            "[REJECT] FEDGATE_NO_DRIVER_AVAILABLE: no common source"
        );
    }
}
