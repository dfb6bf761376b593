//! Planner configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::SourceId;

/// Planner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Tie-break order when ranking driver and enrichment sources.
    /// Sources not listed rank after every listed one.
    #[serde(default)]
    pub source_preference: Vec<SourceId>,

    /// Entity type → attribute keys identifying one entity
    #[serde(default)]
    pub entity_id_columns: BTreeMap<String, Vec<String>>,
}

impl PlannerConfig {
    /// Builder form for the source preference
    pub fn with_source_preference<S: Into<SourceId>>(
        mut self,
        sources: impl IntoIterator<Item = S>,
    ) -> Self {
        self.source_preference = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Builder form for one entity type's id keys
    pub fn with_entity_id_columns<K: Into<String>>(
        mut self,
        entity_type: impl Into<String>,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        self.entity_id_columns
            .insert(entity_type.into(), keys.into_iter().map(Into::into).collect());
        self
    }

    /// Position of `source` in the preference list, `usize::MAX` if absent
    pub fn preference_rank(&self, source: &SourceId) -> usize {
        self.source_preference
            .iter()
            .position(|s| s == source)
            .unwrap_or(usize::MAX)
    }

    /// Configured id keys of an entity type
    pub fn id_keys(&self, entity_type: &str) -> &[String] {
        self.entity_id_columns
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
