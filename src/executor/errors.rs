//! Executor error types
//!
//! Error codes:
//! - FEDGATE_DRIVER_FETCH_FAILED (ERROR)
//! - FEDGATE_ENRICHMENT_FETCH_FAILED (ERROR)
//! - FEDGATE_UNKNOWN_SOURCE (ERROR)

use std::fmt;

use thiserror::Error;

use crate::catalog::SourceId;
use crate::fetcher::FetchError;

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// The driver (or single source) fetch failed
    DriverFetchFailed,
    /// An enrichment fetch failed under the fail-request policy
    EnrichmentFetchFailed,
    /// The plan names a source with no registered fetcher
    UnknownSource,
}

impl ExecutorErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::DriverFetchFailed => "FEDGATE_DRIVER_FETCH_FAILED",
            ExecutorErrorCode::EnrichmentFetchFailed => "FEDGATE_ENRICHMENT_FETCH_FAILED",
            ExecutorErrorCode::UnknownSource => "FEDGATE_UNKNOWN_SOURCE",
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error with code, message and the underlying fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[ERROR] {}: {}", .code.code(), .message)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    #[source]
    cause: Option<FetchError>,
}

impl ExecutorError {
    pub fn driver_fetch_failed(cause: FetchError) -> Self {
        Self {
            code: ExecutorErrorCode::DriverFetchFailed,
            message: format!("driver fetch failed: {}", cause),
            cause: Some(cause),
        }
    }

    pub fn enrichment_fetch_failed(cause: FetchError) -> Self {
        Self {
            code: ExecutorErrorCode::EnrichmentFetchFailed,
            message: format!("enrichment fetch failed: {}", cause),
            cause: Some(cause),
        }
    }

    pub fn unknown_source(source: &SourceId) -> Self {
        Self {
            code: ExecutorErrorCode::UnknownSource,
            message: format!("no fetcher registered for source '{}'", source),
            cause: None,
        }
    }

    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The fetch failure behind this error, if any
    pub fn fetch_error(&self) -> Option<&FetchError> {
        self.cause.as_ref()
    }

    /// Transport failures and timeouts may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.cause,
            Some(FetchError::Transport { .. }) | Some(FetchError::Timeout { .. })
        )
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
