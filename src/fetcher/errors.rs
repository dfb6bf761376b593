//! Fetcher error types

use thiserror::Error;

use crate::catalog::SourceId;

/// Result type for source fetches
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of one source fetch. Nothing is retried by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transport error talking to {source_id}: {message}")]
    Transport { source_id: SourceId, message: String },

    #[error("Source {source_id} failed: {message}")]
    Backend { source_id: SourceId, message: String },

    #[error("Source {source_id} timed out after {timeout_ms}ms")]
    Timeout { source_id: SourceId, timeout_ms: u64 },

    /// The source refused an attribute the catalog claims it serves
    #[error("Source {source_id} rejected the query: {message}")]
    Rejected { source_id: SourceId, message: String },

    #[error("Source {source_id} does not support {operation}")]
    Unsupported {
        source_id: SourceId,
        operation: &'static str,
    },
}

impl FetchError {
    pub fn transport(source_id: SourceId, message: impl Into<String>) -> Self {
        Self::Transport {
            source_id,
            message: message.into(),
        }
    }

    pub fn backend(source_id: SourceId, message: impl Into<String>) -> Self {
        Self::Backend {
            source_id,
            message: message.into(),
        }
    }

    pub fn timeout(source_id: SourceId, timeout_ms: u64) -> Self {
        Self::Timeout {
            source_id,
            timeout_ms,
        }
    }

    pub fn rejected(source_id: SourceId, message: impl Into<String>) -> Self {
        Self::Rejected {
            source_id,
            message: message.into(),
        }
    }

    pub fn unsupported(source_id: SourceId, operation: &'static str) -> Self {
        Self::Unsupported {
            source_id,
            operation,
        }
    }

    /// Source the failure came from
    pub fn source_id(&self) -> &SourceId {
        match self {
            Self::Transport { source_id, .. }
            | Self::Backend { source_id, .. }
            | Self::Timeout { source_id, .. }
            | Self::Rejected { source_id, .. }
            | Self::Unsupported { source_id, .. } => source_id,
        }
    }

    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Backend { .. } => "backend",
            Self::Timeout { .. } => "timeout",
            Self::Rejected { .. } => "rejected",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_source() {
        let err = FetchError::timeout(SourceId::new("EDS"), 250);
        assert_eq!(err.to_string(), "Source EDS timed out after 250ms");
        assert_eq!(err.source_id().as_str(), "EDS");
        assert_eq!(err.kind(), "timeout");
    }
}
