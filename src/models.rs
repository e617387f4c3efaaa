// src/models.rs
//! Report, table and diff structures shared by the loader, differ and aggregator.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;

/// String-keyed map that remembers insertion order.
///
/// Re-inserting an existing key replaces the value in place, so the key keeps
/// the position of its first occurrence (last write wins).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(&pos) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn first(&self) -> Option<(&str, &V)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One table row: header text -> cell text, in header order
pub type Row = OrderedMap<String>;

/// A table extracted from a report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Column whose value identifies a row across two reports
    pub fn identity_column(&self) -> Option<&str> {
        self.headers.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A retrieved and parsed report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Path/slug the report was requested by
    pub identifier: String,
    pub title: String,
    /// Rendered content region, kept for display only
    #[serde(skip_serializing)]
    pub content: String,
    pub metadata: OrderedMap<String>,
    pub tables: OrderedMap<Table>,
}

/// A cell whose text differs between the two sides of a common row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    /// Row identity
    pub row: String,
    pub column: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// Percentage change, when both sides are numeric
    pub numeric_change: Option<f64>,
}

/// Flattened view of a single change record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellChange<'a> {
    Added { row: &'a Row },
    Removed { row: &'a Row },
    ValueChanged(&'a ValueChange),
}

impl CellChange<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            CellChange::Added { .. } => "added",
            CellChange::Removed { .. } => "removed",
            CellChange::ValueChanged(_) => "value_changed",
        }
    }
}

/// Differences between two same-keyed tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableDiff {
    pub name: String,
    pub added: Vec<Row>,
    pub removed: Vec<Row>,
    pub changes: Vec<ValueChange>,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changes.is_empty()
    }

    /// All records: added rows, then removed rows, then value changes
    pub fn cell_changes(&self) -> Vec<CellChange<'_>> {
        self.added
            .iter()
            .map(|row| CellChange::Added { row })
            .chain(self.removed.iter().map(|row| CellChange::Removed { row }))
            .chain(self.changes.iter().map(CellChange::ValueChanged))
            .collect()
    }
}

/// A numeric value change tagged with the table it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChange {
    pub table: String,
    #[serde(flatten)]
    pub change: ValueChange,
}

impl RankedChange {
    /// Percentage change; ranked changes always carry one
    pub fn magnitude(&self) -> f64 {
        self.change.numeric_change.unwrap_or(0.0)
    }
}

/// Outcome of comparing two reports
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub summary: Vec<String>,
    pub table_diffs: OrderedMap<TableDiff>,
    /// Every value change with a numeric percentage
    pub numeric_changes: Vec<RankedChange>,
    /// Top changes for the summary list
    pub headline: Vec<RankedChange>,
    /// One change per row for the trend visualization
    pub trend: Vec<RankedChange>,
}

impl ComparisonResult {
    /// True when nothing differs between the two reports
    pub fn is_unchanged(&self) -> bool {
        self.summary.is_empty() && self.table_diffs.values().all(TableDiff::is_empty)
    }
}
