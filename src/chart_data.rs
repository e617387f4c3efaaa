// src/chart_data.rs
//! Chart Data Preparation
//!
//! Turns extracted tables and trend selections into the flat data arrays a
//! visualization library renders. Which column is the label and which is
//! the value is resolved from `ColumnRoleHints` rather than hard-coded
//! header substrings, so it can be overridden per deployment.

use crate::config::ColumnRoleHints;
use crate::models::{RankedChange, Row, Table};
use crate::utils::leading_float;
use serde::Serialize;

const MAX_LABEL_CHARS: usize = 22;
const TRUNCATED_LABEL_CHARS: usize = 20;

/// Parse a display number such as "1,234", "45%" or "1.2K"; 0 when unparseable
pub fn parse_formatted_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '%' | 'K'))
        .collect();
    let value = leading_float(&cleaned).unwrap_or(0.0);

    if raw.contains('K') {
        value * 1000.0
    } else {
        value
    }
}

fn is_numeric_cell(raw: Option<&String>) -> bool {
    raw.is_some_and(|v| {
        let cleaned: String = v
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '%' | 'K'))
            .collect();
        leading_float(&cleaned).is_some()
    })
}

/// Label/value column assignment for charting a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub label: String,
    pub value: String,
    /// Leading rank column (1, 2, 3, ...) skipped as a label
    pub ranking: Option<String>,
}

impl ColumnRoles {
    /// Resolve roles from header names and the first rows' contents
    pub fn resolve(table: &Table, hints: &ColumnRoleHints) -> Option<Self> {
        let headers = &table.headers;
        let first = headers.first()?;

        let first_values: Vec<&str> = table
            .rows
            .iter()
            .filter_map(|r| r.get(first))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        let is_ranking = !first_values.is_empty()
            && first_values
                .iter()
                .all(|v| v.chars().all(|c| c.is_ascii_digit()));

        let (label, ranking) = if is_ranking && headers.len() > 1 {
            (headers[1].clone(), Some(first.clone()))
        } else {
            (first.clone(), None)
        };

        let value = headers
            .iter()
            .find(|h| hints.is_total(h))
            .or_else(|| headers.iter().find(|h| hints.is_count(h)))
            .or_else(|| {
                headers.iter().find(|h| {
                    **h != label
                        && Some(*h) != ranking.as_ref()
                        && is_numeric_cell(table.rows.first().and_then(|r| r.get(h)))
                })
            })
            .or_else(|| headers.get(2))
            .or_else(|| headers.get(1))
            .cloned()?;

        Some(Self {
            label,
            value,
            ranking,
        })
    }
}

/// One bar/donut slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Data for a bar or donut chart: aggregate rows dropped, first
/// `max_items` rows kept, non-positive values removed
pub fn bar_series(
    table: &Table,
    roles: &ColumnRoles,
    hints: &ColumnRoleHints,
    max_items: usize,
) -> Vec<SeriesPoint> {
    let label_of = |row: &Row| row.get(&roles.label).cloned().unwrap_or_default();

    table
        .rows
        .iter()
        .filter(|row| !hints.is_aggregate_row(&label_of(row)))
        .take(max_items)
        .map(|row| SeriesPoint {
            label: label_of(row),
            value: row
                .get(&roles.value)
                .map(|v| parse_formatted_number(v))
                .unwrap_or(0.0),
        })
        .filter(|p| p.value > 0.0)
        .collect()
}

/// A table with several numeric columns is drawn as a heatmap
pub fn is_cross_tab(table: &Table) -> bool {
    if table.headers.len() < 3 {
        return false;
    }
    let Some(first_row) = table.rows.first() else {
        return false;
    };

    let numeric_columns = table.headers[1..]
        .iter()
        .filter(|h| is_numeric_cell(first_row.get(h)))
        .count();

    numeric_columns > 2
}

/// One lollipop in the trend chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub label: String,
    pub value: f64,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

pub fn trend_points(trend: &[RankedChange]) -> Vec<TrendPoint> {
    trend
        .iter()
        .map(|c| TrendPoint {
            label: shorten_label(&c.change.row),
            value: c.magnitude(),
            old_value: c.change.old_value.clone(),
            new_value: c.change.new_value.clone(),
        })
        .collect()
}

/// Axis label: at most 22 characters, otherwise 20 plus "..."
pub fn shorten_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(TRUNCATED_LABEL_CHARS).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}
