// src/analysis/differ.rs
//! Table Differ
//!
//! Aligns two tables by their row identity column (the left table's first
//! header) and reports added rows, removed rows and per-cell value changes.
//! Cell text is compared verbatim; numeric percentages are computed only
//! for display and ranking.

use crate::config::NumberFormat;
use crate::models::{OrderedMap, Row, Table, TableDiff, ValueChange};
use crate::utils::leading_float;

/// Percentage reported when a value appears from zero
pub const FROM_ZERO_CHANGE: f64 = 100.0;

/// Parse cell text as a number.
///
/// Separators, configured glyphs and whitespace are removed first; the
/// longest leading decimal literal is then parsed, so "12.5x" reads as 12.5.
pub fn parse_number(raw: &str, format: &NumberFormat) -> Option<f64> {
    leading_float(&format.clean(raw))
}

/// Relative change from `old` to `new`, in percent
pub fn percent_change(old: f64, new: f64) -> Option<f64> {
    if old != 0.0 {
        Some((new - old) / old * 100.0)
    } else if new != 0.0 {
        Some(FROM_ZERO_CHANGE)
    } else {
        None
    }
}

/// Compares tables sharing the same table-key
pub struct TableDiffer<'a> {
    numbers: &'a NumberFormat,
}

impl<'a> TableDiffer<'a> {
    pub fn new(numbers: &'a NumberFormat) -> Self {
        Self { numbers }
    }

    /// Numeric change between two raw cells, if both parse
    pub fn numeric_change(&self, old: Option<&str>, new: Option<&str>) -> Option<f64> {
        let old = parse_number(old?, self.numbers)?;
        let new = parse_number(new?, self.numbers)?;
        percent_change(old, new)
    }

    /// Diff `right` against `left`
    pub fn diff(&self, name: &str, left: &Table, right: &Table) -> TableDiff {
        let mut diff = TableDiff {
            name: name.to_string(),
            ..Default::default()
        };

        if left.is_empty() && right.is_empty() {
            return diff;
        }

        // Both sides are keyed by the left table's identity column; a
        // header-less left side falls back to the right's
        let id_col = left
            .identity_column()
            .or_else(|| right.identity_column())
            .unwrap_or_default();
        let left_rows = index_rows(left, id_col);
        let right_rows = index_rows(right, id_col);

        for (id, row) in right_rows.iter() {
            if !left_rows.contains_key(id) {
                diff.added.push(Row::clone(row));
            }
        }

        for (id, row) in left_rows.iter() {
            if !right_rows.contains_key(id) {
                diff.removed.push(Row::clone(row));
            }
        }

        for (id, left_row) in left_rows.iter() {
            let Some(right_row) = right_rows.get(id) else {
                continue;
            };

            // Only the left table's columns are compared
            for column in &left.headers {
                let old_value = left_row.get(column).map(String::as_str);
                let new_value = right_row.get(column).map(String::as_str);

                if old_value != new_value {
                    diff.changes.push(ValueChange {
                        row: id.to_string(),
                        column: column.clone(),
                        old_value: old_value.map(str::to_string),
                        new_value: new_value.map(str::to_string),
                        numeric_change: self.numeric_change(old_value, new_value),
                    });
                }
            }
        }

        diff
    }
}

/// identity -> row; a later duplicate identity replaces the earlier row
fn index_rows<'t>(table: &'t Table, id_col: &str) -> OrderedMap<&'t Row> {
    table
        .rows
        .iter()
        .map(|row| (row.get(id_col).cloned().unwrap_or_default(), row))
        .collect()
}
