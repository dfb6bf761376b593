//! Per-request planning state
//!
//! Every section of the request (selection, metric, time aggregation,
//! group-by, selection order-by, metric order-by, filter) is indexed by source: an
//! expression is listed under every source that can serve its attribute.
//! Placement is undecided at this stage, so an attribute servable by k
//! sources shows up in k buckets.
//!
//! Invariants:
//! - an attribute is in a source bucket only if the source is capable
//! - after construction the only mutation is `remove_selection_attributes`

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{AttributeCatalog, AttributeId, CatalogResult, RequestAttributeCache, SourceId};
use crate::request::{Expression, OrderByExpression, OrderByKind, QueryRequest, TimeAggregation};

/// Source → ordered expressions of one section
pub type SourceExpressionMap<T> = BTreeMap<SourceId, Vec<T>>;
/// Source → attributes of one section
pub type SourceAttributeMap = BTreeMap<SourceId, BTreeSet<AttributeId>>;
/// Attribute → capable sources
pub type AttributeSourceMap = BTreeMap<AttributeId, BTreeSet<SourceId>>;

#[derive(Debug, Clone)]
struct Section<T> {
    expressions: SourceExpressionMap<T>,
    attributes: SourceAttributeMap,
}

impl<T: Clone> Section<T> {
    fn index<'a, I, F>(items: I, attribute_of: F, capabilities: &AttributeSourceMap) -> Self
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
        F: Fn(&T) -> &AttributeId,
    {
        let mut expressions = SourceExpressionMap::new();
        let mut attributes = SourceAttributeMap::new();

        for item in items {
            let attribute = attribute_of(item);
            let Some(sources) = capabilities.get(attribute) else {
                continue;
            };
            for source in sources {
                expressions
                    .entry(source.clone())
                    .or_insert_with(Vec::new)
                    .push(item.clone());
                attributes
                    .entry(source.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(attribute.clone());
            }
        }

        Self {
            expressions,
            attributes,
        }
    }
}

/// Source-indexed and attribute-indexed views of one request
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    entity_type: String,
    id_attributes: Vec<AttributeId>,
    selections: Section<Expression>,
    metrics: Section<Expression>,
    time_aggregations: Section<TimeAggregation>,
    group_by: Section<Expression>,
    selection_order_bys: Section<OrderByExpression>,
    metric_order_bys: Section<OrderByExpression>,
    filters: Section<Expression>,
    filter_attribute_to_sources: AttributeSourceMap,
    all_attribute_to_sources: AttributeSourceMap,
}

impl ExecutionContext {
    /// Resolves every referenced attribute through the catalog and builds
    /// the context. Unknown attributes get an empty capability set.
    pub fn build<C: AttributeCatalog + ?Sized>(
        request: &QueryRequest,
        id_attributes: Vec<AttributeId>,
        cache: &mut RequestAttributeCache<'_, C>,
    ) -> CatalogResult<Self> {
        let mut capabilities = AttributeSourceMap::new();
        for attribute in referenced_attributes(request) {
            if !capabilities.contains_key(attribute) {
                let sources = cache.capable_sources(attribute)?;
                capabilities.insert(attribute.clone(), sources);
            }
        }
        Ok(Self::from_capabilities(request, id_attributes, &capabilities))
    }

    /// Builds the context from already resolved capabilities
    pub fn from_capabilities(
        request: &QueryRequest,
        id_attributes: Vec<AttributeId>,
        capabilities: &AttributeSourceMap,
    ) -> Self {
        let filter_leaves: Vec<&Expression> = request
            .effective_filter()
            .map(|filter| filter.leaf_expressions())
            .unwrap_or_default();

        let mut filter_attribute_to_sources = AttributeSourceMap::new();
        for leaf in &filter_leaves {
            let attribute = leaf.attribute_id();
            let sources = capabilities.get(attribute).cloned().unwrap_or_default();
            if !sources.is_empty() {
                filter_attribute_to_sources.insert(attribute.clone(), sources);
            }
        }

        let all_attribute_to_sources = referenced_attributes(request)
            .into_iter()
            .map(|attribute| {
                let sources = capabilities.get(attribute).cloned().unwrap_or_default();
                (attribute.clone(), sources)
            })
            .collect();

        Self {
            entity_type: request.entity_type.clone(),
            id_attributes,
            selections: Section::index(&request.selections, Expression::attribute_id, capabilities),
            metrics: Section::index(
                &request.metric_selections,
                Expression::attribute_id,
                capabilities,
            ),
            time_aggregations: Section::index(
                &request.time_aggregations,
                TimeAggregation::attribute_id,
                capabilities,
            ),
            group_by: Section::index(&request.group_by, Expression::attribute_id, capabilities),
            selection_order_bys: Section::index(
                request
                    .order_by
                    .iter()
                    .filter(|o| o.kind() == OrderByKind::Selection),
                OrderByExpression::attribute_id,
                capabilities,
            ),
            metric_order_bys: Section::index(
                request
                    .order_by
                    .iter()
                    .filter(|o| o.kind() == OrderByKind::Metric),
                OrderByExpression::attribute_id,
                capabilities,
            ),
            filters: Section::index(filter_leaves, Expression::attribute_id, capabilities),
            filter_attribute_to_sources,
            all_attribute_to_sources,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Attributes identifying an entity of this type
    pub fn id_attributes(&self) -> &[AttributeId] {
        &self.id_attributes
    }

    pub fn source_to_selection_expressions(&self) -> &SourceExpressionMap<Expression> {
        &self.selections.expressions
    }

    pub fn source_to_selection_attributes(&self) -> &SourceAttributeMap {
        &self.selections.attributes
    }

    pub fn source_to_metric_expressions(&self) -> &SourceExpressionMap<Expression> {
        &self.metrics.expressions
    }

    pub fn source_to_metric_attributes(&self) -> &SourceAttributeMap {
        &self.metrics.attributes
    }

    pub fn source_to_time_aggregations(&self) -> &SourceExpressionMap<TimeAggregation> {
        &self.time_aggregations.expressions
    }

    pub fn source_to_time_aggregation_attributes(&self) -> &SourceAttributeMap {
        &self.time_aggregations.attributes
    }

    pub fn source_to_group_by_expressions(&self) -> &SourceExpressionMap<Expression> {
        &self.group_by.expressions
    }

    pub fn source_to_group_by_attributes(&self) -> &SourceAttributeMap {
        &self.group_by.attributes
    }

    /// True if `source` serves every group-by attribute some source serves
    pub fn group_by_covered_by(&self, source: &SourceId) -> bool {
        let servable: BTreeSet<&AttributeId> =
            self.group_by.attributes.values().flatten().collect();
        match self.group_by.attributes.get(source) {
            Some(own) => own.len() == servable.len(),
            None => servable.is_empty(),
        }
    }

    pub fn source_to_selection_order_bys(&self) -> &SourceExpressionMap<OrderByExpression> {
        &self.selection_order_bys.expressions
    }

    pub fn source_to_selection_order_by_attributes(&self) -> &SourceAttributeMap {
        &self.selection_order_bys.attributes
    }

    pub fn source_to_metric_order_bys(&self) -> &SourceExpressionMap<OrderByExpression> {
        &self.metric_order_bys.expressions
    }

    pub fn source_to_metric_order_by_attributes(&self) -> &SourceAttributeMap {
        &self.metric_order_bys.attributes
    }

    pub fn source_to_filter_expressions(&self) -> &SourceExpressionMap<Expression> {
        &self.filters.expressions
    }

    pub fn source_to_filter_attributes(&self) -> &SourceAttributeMap {
        &self.filters.attributes
    }

    /// Filter attributes with at least one capable source
    pub fn filter_attribute_to_sources(&self) -> &AttributeSourceMap {
        &self.filter_attribute_to_sources
    }

    /// Every referenced attribute, including those no source can serve
    pub fn all_attribute_to_sources(&self) -> &AttributeSourceMap {
        &self.all_attribute_to_sources
    }

    /// True if a filter or an order-by restricts which source may drive
    pub fn has_driver_constraints(&self) -> bool {
        !self.filters.attributes.is_empty()
            || !self.selection_order_bys.attributes.is_empty()
            || !self.metric_order_bys.attributes.is_empty()
    }

    /// Sources serving at least one selection, metric or time aggregation
    pub fn fetchable_sources(&self) -> BTreeSet<SourceId> {
        self.selections
            .attributes
            .keys()
            .chain(self.metrics.attributes.keys())
            .chain(self.time_aggregations.attributes.keys())
            .cloned()
            .collect()
    }

    /// Number of selection attributes currently assigned to `source`
    pub fn selection_count(&self, source: &SourceId) -> usize {
        self.selections
            .attributes
            .get(source)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    /// Removes `attributes` from the selection bucket of `source`.
    ///
    /// Other sections are left untouched. A bucket that becomes empty is
    /// dropped.
    pub fn remove_selection_attributes(
        &mut self,
        source: &SourceId,
        attributes: &BTreeSet<AttributeId>,
    ) {
        if let Some(expressions) = self.selections.expressions.get_mut(source) {
            expressions.retain(|e| !attributes.contains(e.attribute_id()));
            if expressions.is_empty() {
                self.selections.expressions.remove(source);
            }
        }
        if let Some(remaining) = self.selections.attributes.get_mut(source) {
            remaining.retain(|a| !attributes.contains(a));
            if remaining.is_empty() {
                self.selections.attributes.remove(source);
            }
        }
    }
}

/// Every attribute the request references, in section order
fn referenced_attributes(request: &QueryRequest) -> Vec<&AttributeId> {
    let mut attributes: Vec<&AttributeId> = Vec::new();
    attributes.extend(request.selections.iter().map(Expression::attribute_id));
    attributes.extend(request.metric_selections.iter().map(Expression::attribute_id));
    attributes.extend(request.time_aggregations.iter().map(TimeAggregation::attribute_id));
    attributes.extend(request.group_by.iter().map(Expression::attribute_id));
    attributes.extend(request.order_by.iter().map(OrderByExpression::attribute_id));
    if let Some(filter) = request.effective_filter() {
        attributes.extend(filter.leaf_expressions().into_iter().map(Expression::attribute_id));
    }
    attributes
}
