//! Source selection over an execution context
//!
//! Pure functions, no I/O. Given the per-source buckets of a request they
//! answer: can one source serve everything, which sources may drive, does
//! a source cover every filter, and which duplicate selections to drop.

use std::collections::BTreeSet;

use crate::catalog::SourceId;
use crate::context::{AttributeSourceMap, ExecutionContext, SourceAttributeMap};

/// The one source capable of serving every referenced attribute.
///
/// Attributes no source can serve are ignored. Returns `None` when the
/// intersection is empty, has more than one member, or nothing is servable.
pub fn single_source_for_all_attributes(ctx: &ExecutionContext) -> Option<SourceId> {
    let mut common: Option<BTreeSet<SourceId>> = None;

    for sources in ctx.all_attribute_to_sources().values() {
        if sources.is_empty() {
            continue;
        }
        common = Some(match common {
            None => sources.clone(),
            Some(acc) => acc.intersection(sources).cloned().collect(),
        });
    }

    let common = common?;
    if common.len() == 1 {
        common.into_iter().next()
    } else {
        None
    }
}

/// Sources able to own filtering and ordering.
///
/// Filter, selection order-by and metric order-by attributes are merged by
/// attribute; the result is the intersection of their source sets. Empty
/// when there are no such attributes.
pub fn driver_sources(ctx: &ExecutionContext) -> BTreeSet<SourceId> {
    let mut attribute_to_sources = AttributeSourceMap::new();
    invert_into(ctx.source_to_filter_attributes(), &mut attribute_to_sources);
    invert_into(ctx.source_to_selection_order_by_attributes(), &mut attribute_to_sources);
    invert_into(ctx.source_to_metric_order_by_attributes(), &mut attribute_to_sources);

    let mut sets = attribute_to_sources.into_values();
    let Some(first) = sets.next() else {
        return BTreeSet::new();
    };
    sets.fold(first, |acc, sources| {
        acc.intersection(&sources).cloned().collect()
    })
}

fn invert_into(source_to_attributes: &SourceAttributeMap, out: &mut AttributeSourceMap) {
    for (source, attributes) in source_to_attributes {
        for attribute in attributes {
            out.entry(attribute.clone())
                .or_insert_with(BTreeSet::new)
                .insert(source.clone());
        }
    }
}

/// True if `source` can evaluate every filter of the request by itself.
///
/// Vacuously true without filters; false for a source with no filter bucket.
pub fn filters_fully_covered_by(ctx: &ExecutionContext, source: &SourceId) -> bool {
    let source_to_filters = ctx.source_to_filter_attributes();
    if source_to_filters.is_empty() {
        return true;
    }
    let Some(covered) = source_to_filters.get(source) else {
        return false;
    };
    let all_filters: BTreeSet<_> = source_to_filters.values().flatten().collect();
    covered.len() == all_filters.len() && covered.iter().all(|a| all_filters.contains(a))
}

/// Removes from every other source the selection attributes `preferred`
/// already serves. The preferred bucket is left as is.
pub fn dedupe_selections_preferring(ctx: &mut ExecutionContext, preferred: &SourceId) {
    let Some(kept) = ctx.source_to_selection_attributes().get(preferred).cloned() else {
        return;
    };

    let overlaps: Vec<(SourceId, BTreeSet<_>)> = ctx
        .source_to_selection_attributes()
        .iter()
        .filter(|(source, _)| *source != preferred)
        .map(|(source, attributes)| {
            let shared: BTreeSet<_> = attributes.intersection(&kept).cloned().collect();
            (source.clone(), shared)
        })
        .filter(|(_, shared)| !shared.is_empty())
        .collect();

    for (source, shared) in overlaps {
        ctx.remove_selection_attributes(&source, &shared);
    }
}
