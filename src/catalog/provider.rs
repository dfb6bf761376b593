//! Attribute catalog interface and per-request cache

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::request::RequestContext;

use super::errors::CatalogResult;
use super::types::{AttributeId, AttributeMetadata, SourceId};

/// Attribute catalog consumed by the planner (read-only).
///
/// The request context is passed through untouched; implementations use it
/// to pick the tenant.
pub trait AttributeCatalog: Send + Sync {
    /// Resolve one attribute by scope and key
    fn resolve(
        &self,
        ctx: &RequestContext,
        scope: &str,
        key: &str,
    ) -> CatalogResult<AttributeMetadata>;

    /// Resolve every attribute of a scope
    fn resolve_all(
        &self,
        ctx: &RequestContext,
        scope: &str,
    ) -> CatalogResult<BTreeMap<AttributeId, AttributeMetadata>>;
}

/// Catalog answers memoized for the lifetime of one request.
///
/// Each scope is fetched with `resolve_all` at most once.
pub struct RequestAttributeCache<'a, C: AttributeCatalog + ?Sized> {
    catalog: &'a C,
    ctx: &'a RequestContext,
    scopes: HashMap<String, BTreeMap<AttributeId, AttributeMetadata>>,
}

impl<'a, C: AttributeCatalog + ?Sized> RequestAttributeCache<'a, C> {
    pub fn new(catalog: &'a C, ctx: &'a RequestContext) -> Self {
        Self {
            catalog,
            ctx,
            scopes: HashMap::new(),
        }
    }

    /// Metadata for an attribute, `None` if the catalog does not know it
    pub fn lookup(&mut self, id: &AttributeId) -> CatalogResult<Option<&AttributeMetadata>> {
        let scope = id.scope();
        if !self.scopes.contains_key(scope) {
            let resolved = self.catalog.resolve_all(self.ctx, scope)?;
            self.scopes.insert(scope.to_string(), resolved);
        }
        Ok(self.scopes.get(scope).and_then(|attributes| attributes.get(id)))
    }

    /// Capable sources of an attribute; unknown attributes have none
    pub fn capable_sources(&mut self, id: &AttributeId) -> CatalogResult<BTreeSet<SourceId>> {
        Ok(self
            .lookup(id)?
            .map(|meta| meta.capable_sources.clone())
            .unwrap_or_default())
    }

    /// Metadata for one scope/key pair, `None` if the catalog does not know
    /// it. Served from the scope cache, so id keys and request attributes of
    /// the same scope cost one `resolve_all`.
    pub fn resolve_key(&mut self, scope: &str, key: &str) -> CatalogResult<Option<AttributeMetadata>> {
        let id = AttributeId::from_scope_and_key(scope, key);
        Ok(self.lookup(&id)?.cloned())
    }

    /// Number of scopes fetched so far
    pub fn cached_scopes(&self) -> usize {
        self.scopes.len()
    }
}
