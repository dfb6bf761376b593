//! Catalog error types

use thiserror::Error;

/// Result type for catalog lookups
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors reported by an attribute catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No metadata for this scope and key
    #[error("Unknown attribute '{scope}.{key}'")]
    NotFound { scope: String, key: String },

    /// The catalog could not be reached or answered with an error
    #[error("Attribute catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    pub fn not_found(scope: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            scope: scope.into(),
            key: key.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Returns true for unresolved attributes
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
