//! Attribute and source identity types

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a backend data source, e.g. `QS` or `EDS`.
///
/// The set of sources is open: any token is a valid source and capability
/// data alone decides what it can serve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Attribute identifier of the form `<Scope>.<Key>`, e.g. `API.name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(String);

impl AttributeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds `<scope>.<key>`
    pub fn from_scope_and_key(scope: &str, key: &str) -> Self {
        Self(format!("{}.{}", scope, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scope part (everything before the first `.`)
    pub fn scope(&self) -> &str {
        self.0.split_once('.').map(|(scope, _)| scope).unwrap_or(&self.0)
    }

    /// Key part (everything after the first `.`), empty if there is none
    pub fn key(&self) -> &str {
        self.0.split_once('.').map(|(_, key)| key).unwrap_or("")
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AttributeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Catalog answer for one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub id: AttributeId,
    pub scope: String,
    pub key: String,
    /// Sources able to serve this attribute. May be empty.
    #[serde(default)]
    pub capable_sources: BTreeSet<SourceId>,
}

impl AttributeMetadata {
    pub fn new<S: Into<SourceId>>(
        scope: impl Into<String>,
        key: impl Into<String>,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        let scope = scope.into();
        let key = key.into();
        Self {
            id: AttributeId::from_scope_and_key(&scope, &key),
            scope,
            key,
            capable_sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `source` can serve this attribute
    pub fn is_servable_by(&self, source: &SourceId) -> bool {
        self.capable_sources.contains(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_id_parts() {
        let id = AttributeId::from_scope_and_key("API", "name");
        assert_eq!(id.as_str(), "API.name");
        assert_eq!(id.scope(), "API");
        assert_eq!(id.key(), "name");
    }

    #[test]
    fn test_attribute_id_without_key() {
        let id = AttributeId::new("orphan");
        assert_eq!(id.scope(), "orphan");
        assert_eq!(id.key(), "");
    }

    #[test]
    fn test_metadata_capability() {
        let meta = AttributeMetadata::new("API", "id", ["QS", "EDS"]);
        assert_eq!(meta.id, AttributeId::new("API.id"));
        assert!(meta.is_servable_by(&SourceId::new("EDS")));
        assert!(!meta.is_servable_by(&SourceId::new("AS")));
    }

    #[test]
    fn test_source_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SourceId::new("QS")).unwrap();
        assert_eq!(json, "\"QS\"");
    }
}
