//! Static in-process attribute catalog

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::RequestContext;

use super::errors::{CatalogError, CatalogResult};
use super::provider::AttributeCatalog;
use super::types::{AttributeId, AttributeMetadata, SourceId};

/// Catalog backed by a fixed attribute list.
///
/// Answers are the same for every tenant. Useful for embedding a known
/// capability table and as a substitute for the catalog service in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    attributes: BTreeMap<AttributeId, AttributeMetadata>,
    #[serde(skip)]
    failure: Option<String>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a list of attribute metadata
    pub fn from_attributes(attributes: impl IntoIterator<Item = AttributeMetadata>) -> Self {
        let mut catalog = Self::new();
        for meta in attributes {
            catalog.register(meta);
        }
        catalog
    }

    /// Adds or replaces an attribute
    pub fn register(&mut self, meta: AttributeMetadata) {
        self.attributes.insert(meta.id.clone(), meta);
    }

    /// Builder form of `register`
    pub fn with_attribute<S: Into<SourceId>>(
        mut self,
        scope: &str,
        key: &str,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        self.register(AttributeMetadata::new(scope, key, sources));
        self
    }

    /// Makes every lookup fail with `CatalogError::Unavailable`
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn check_available(&self) -> CatalogResult<()> {
        match &self.failure {
            Some(reason) => Err(CatalogError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl AttributeCatalog for InMemoryCatalog {
    fn resolve(
        &self,
        _ctx: &RequestContext,
        scope: &str,
        key: &str,
    ) -> CatalogResult<AttributeMetadata> {
        self.check_available()?;
        self.attributes
            .get(&AttributeId::from_scope_and_key(scope, key))
            .cloned()
            .ok_or_else(|| CatalogError::not_found(scope, key))
    }

    fn resolve_all(
        &self,
        _ctx: &RequestContext,
        scope: &str,
    ) -> CatalogResult<BTreeMap<AttributeId, AttributeMetadata>> {
        self.check_available()?;
        Ok(self
            .attributes
            .iter()
            .filter(|(_, meta)| meta.scope == scope)
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect())
    }
}
