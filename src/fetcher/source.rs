//! Source fetcher contract and registry

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::catalog::SourceId;
use crate::request::RequestContext;

use super::errors::{FetchError, FetchResult};
use super::query::{DriverQuery, EnrichmentQuery};
use super::rows::RowSet;

/// Boxed future returned by fetchers
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = FetchResult<T>> + Send + 'a>>;

/// One backend data source.
///
/// Implementations own the wire protocol. Every returned row must carry
/// the entity id built from the query's id attributes.
pub trait SourceFetcher: Send + Sync {
    /// Source this fetcher talks to
    fn source(&self) -> &SourceId;

    /// Filtered, ordered, paginated fetch
    fn fetch_rows<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a DriverQuery,
    ) -> FetchFuture<'a, RowSet>;

    /// Fetch for a fixed id set; the rows may come back in any order and
    /// ids the source does not know may be missing
    fn fetch_rows_for_ids<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a EnrichmentQuery,
    ) -> FetchFuture<'a, RowSet>;

    /// Number of entities matching the query, ignoring pagination
    fn fetch_total<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _query: &'a DriverQuery,
    ) -> FetchFuture<'a, u64> {
        let source = self.source().clone();
        Box::pin(async move { Err(FetchError::unsupported(source, "fetch_total")) })
    }
}

/// Fetchers by source
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: BTreeMap<SourceId, Arc<dyn SourceFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fetcher under its own source id, replacing any previous one
    pub fn register(&mut self, fetcher: impl SourceFetcher + 'static) {
        self.register_arc(Arc::new(fetcher));
    }

    pub fn register_arc(&mut self, fetcher: Arc<dyn SourceFetcher>) {
        self.fetchers.insert(fetcher.source().clone(), fetcher);
    }

    /// Builder form of `register`
    pub fn with(mut self, fetcher: impl SourceFetcher + 'static) -> Self {
        self.register(fetcher);
        self
    }

    pub fn get(&self, source: &SourceId) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers.get(source).cloned()
    }

    pub fn contains(&self, source: &SourceId) -> bool {
        self.fetchers.contains_key(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceId> {
        self.fetchers.keys()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("sources", &self.fetchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::EntityRow;
    use crate::request::QueryRequest;

    struct EchoFetcher {
        source: SourceId,
    }

    impl SourceFetcher for EchoFetcher {
        fn source(&self) -> &SourceId {
            &self.source
        }

        fn fetch_rows<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _query: &'a DriverQuery,
        ) -> FetchFuture<'a, RowSet> {
            Box::pin(async move { Ok(RowSet::new(vec![EntityRow::new("a")])) })
        }

        fn fetch_rows_for_ids<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            query: &'a EnrichmentQuery,
        ) -> FetchFuture<'a, RowSet> {
            Box::pin(async move {
                Ok(RowSet::new(
                    query.entity_ids.iter().cloned().map(EntityRow::new).collect(),
                ))
            })
        }
    }

    #[test]
    fn test_registry_keyed_by_source() {
        let registry = FetcherRegistry::new().with(EchoFetcher {
            source: SourceId::new("QS"),
        });
        assert!(registry.contains(&SourceId::new("QS")));
        assert!(registry.get(&SourceId::new("EDS")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_total_unsupported_by_default() {
        let fetcher = EchoFetcher {
            source: SourceId::new("QS"),
        };
        let ctx = RequestContext::new("tenant");
        let query = DriverQuery::from_request(&QueryRequest::new("API"), vec![]);

        let err = fetcher.fetch_total(&ctx, &query).await.unwrap_err();
        assert_eq!(err.kind(), "unsupported");

        let rows = fetcher.fetch_rows(&ctx, &query).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
