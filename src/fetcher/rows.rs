//! Rows returned by source fetchers

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity identity as reported by a source.
///
/// For composite ids the fetcher joins the id attribute values; the gateway
/// only compares ids for equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One entity with its result columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: EntityId,
    /// Result column name → value
    pub columns: BTreeMap<String, Value>,
}

impl EntityRow {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder form of `set`
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }
}

/// Rows of one fetch, in the order the source returned them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub rows: Vec<EntityRow>,
}

impl RowSet {
    pub fn new(rows: Vec<EntityRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRow> {
        self.rows.iter()
    }

    /// Ids in row order
    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    /// Rows keyed by id. On duplicate ids the first row wins.
    pub fn index_by_id(&self) -> HashMap<&EntityId, &EntityRow> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            index.entry(&row.id).or_insert(row);
        }
        index
    }
}

impl IntoIterator for RowSet {
    type Item = EntityRow;
    type IntoIter = std::vec::IntoIter<EntityRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
