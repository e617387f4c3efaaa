// src/analysis/aggregator.rs
//! Change Aggregator
//!
//! Reduces the per-table diffs of two reports into one `ComparisonResult`:
//! table-level add/remove lines, a terse headline of the largest numeric
//! changes, and a looser one-entry-per-row trend selection.

use crate::analysis::differ::TableDiffer;
use crate::config::{ColumnRoleHints, CompareConfig, RankingConfig};
use crate::models::{ComparisonResult, RankedChange, Report};
use log::debug;
use std::collections::HashSet;

pub const TABLE_ADDED_PREFIX: &str = "新增表格：";
pub const TABLE_REMOVED_PREFIX: &str = "移除表格：";

pub struct ChangeAggregator<'a> {
    config: &'a CompareConfig,
}

impl<'a> ChangeAggregator<'a> {
    pub fn new(config: &'a CompareConfig) -> Self {
        Self { config }
    }

    /// Compare every table of `left` with its counterpart in `right`
    pub fn compare(&self, left: &Report, right: &Report) -> ComparisonResult {
        let differ = TableDiffer::new(&self.config.numbers);
        let mut result = ComparisonResult::default();

        let mut keys: Vec<&str> = left.tables.keys().collect();
        keys.extend(right.tables.keys().filter(|k| !left.tables.contains_key(k)));

        for key in keys {
            match (left.tables.get(key), right.tables.get(key)) {
                (Some(l), Some(r)) => {
                    let diff = differ.diff(key, l, r);
                    for change in &diff.changes {
                        if change.numeric_change.is_some() {
                            result.numeric_changes.push(RankedChange {
                                table: key.to_string(),
                                change: change.clone(),
                            });
                        }
                    }
                    result.table_diffs.insert(key, diff);
                }
                (None, Some(_)) => {
                    debug!("Table only in right report: {}", key);
                    result.summary.push(format!("{}{}", TABLE_ADDED_PREFIX, key));
                }
                (Some(_), None) => {
                    debug!("Table only in left report: {}", key);
                    result.summary.push(format!("{}{}", TABLE_REMOVED_PREFIX, key));
                }
                (None, None) => {}
            }
        }

        result.headline = select_headline(&result.numeric_changes, &self.config.ranking);
        result
            .summary
            .extend(result.headline.iter().map(format_headline));
        result.trend = select_trend(
            &result.numeric_changes,
            &self.config.ranking,
            &self.config.roles,
        );

        debug!(
            "Comparison of {} vs {}: {} table diffs, {} numeric changes",
            left.identifier,
            right.identifier,
            result.table_diffs.len(),
            result.numeric_changes.len()
        );

        result
    }
}

/// Largest changes by absolute magnitude, for the summary list
pub fn select_headline(changes: &[RankedChange], ranking: &RankingConfig) -> Vec<RankedChange> {
    let mut selected: Vec<RankedChange> = changes
        .iter()
        .filter(|c| c.magnitude().abs() >= ranking.headline_threshold)
        .cloned()
        .collect();
    sort_by_magnitude(&mut selected);
    selected.truncate(ranking.headline_limit);
    selected
}

/// One change per row identity for the trend visualization.
///
/// Aggregate rows are dropped; when a row changed in several columns the
/// total column wins, otherwise the largest change.
pub fn select_trend(
    changes: &[RankedChange],
    ranking: &RankingConfig,
    roles: &ColumnRoleHints,
) -> Vec<RankedChange> {
    let mut candidates: Vec<RankedChange> = changes
        .iter()
        .filter(|c| c.magnitude().abs() >= ranking.trend_threshold)
        .filter(|c| !roles.is_aggregate_row(&c.change.row))
        .cloned()
        .collect();

    candidates.sort_by(|a, b| {
        let a_total = roles.is_total(&a.change.column);
        let b_total = roles.is_total(&b.change.column);
        b_total
            .cmp(&a_total)
            .then_with(|| b.magnitude().abs().total_cmp(&a.magnitude().abs()))
    });

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.change.row.clone()));

    sort_by_magnitude(&mut candidates);
    candidates.truncate(ranking.trend_limit);
    candidates
}

/// `<row>: ↑ 12.5%`
pub fn format_headline(change: &RankedChange) -> String {
    let magnitude = change.magnitude();
    let direction = if magnitude > 0.0 { '↑' } else { '↓' };
    format!("{}: {} {:.1}%", change.change.row, direction, magnitude.abs())
}

fn sort_by_magnitude(changes: &mut [RankedChange]) {
    changes.sort_by(|a, b| b.magnitude().abs().total_cmp(&a.magnitude().abs()));
}
