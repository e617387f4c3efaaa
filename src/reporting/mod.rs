// src/reporting/mod.rs
//! Comparison output
//!
//! Renders a finished comparison for a terminal, as a JSON export for other
//! tooling, or as the HTML fragments the comparison page shows.

pub mod console;
pub mod export;
pub mod html;

pub use console::render_console;
pub use export::ComparisonExport;
pub use html::{escape_html, render_detailed_diff, render_page, render_summary_list};

use crate::models::{Row, TableDiff, ValueChange};
use std::path::PathBuf;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => ReportFormat::Json,
            "html" | "htm" => ReportFormat::Html,
            _ => ReportFormat::Text,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }

    /// `path` with this format's extension added when it has none
    pub fn output_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(self.extension())
        }
    }
}

/// Display name of a row: its first cell
pub fn row_label(row: &Row) -> &str {
    row.first().map(|(_, v)| v.as_str()).unwrap_or("")
}

/// Value changes worth listing in the detailed view
pub fn significant_changes(diff: &TableDiff, threshold: f64) -> impl Iterator<Item = &ValueChange> {
    diff.changes
        .iter()
        .filter(move |c| c.numeric_change.is_some_and(|pct| pct.abs() >= threshold))
}

/// `↑ 12.5%` / `↓ 3.0%`
pub fn change_arrow(pct: f64) -> String {
    let arrow = if pct > 0.0 { '↑' } else { '↓' };
    format!("{} {:.1}%", arrow, pct.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format_parsing() {
        assert_eq!(ReportFormat::from_str("JSON"), ReportFormat::Json);
        assert_eq!(ReportFormat::from_str("htm"), ReportFormat::Html);
        assert_eq!(ReportFormat::from_str("text"), ReportFormat::Text);
        assert_eq!(ReportFormat::from_str("unknown"), ReportFormat::Text);
        assert_eq!(ReportFormat::Html.extension(), "html");
    }

    #[test]
    fn test_output_path_gets_format_extension() {
        assert_eq!(ReportFormat::Json.output_path("out/compare"), PathBuf::from("out/compare.json"));
        assert_eq!(ReportFormat::Html.output_path("compare.htm"), PathBuf::from("compare.htm"));
        assert_eq!(ReportFormat::Text.output_path("summary"), PathBuf::from("summary.txt"));
    }

    #[test]
    fn test_significant_changes_threshold() {
        let change = |pct: Option<f64>| ValueChange {
            row: "r".to_string(),
            column: "c".to_string(),
            old_value: None,
            new_value: None,
            numeric_change: pct,
        };
        let diff = TableDiff {
            name: "t".to_string(),
            added: vec![],
            removed: vec![],
            changes: vec![change(Some(0.5)), change(Some(-1.0)), change(None), change(Some(20.0))],
        };

        assert_eq!(significant_changes(&diff, 1.0).count(), 2);
        assert_eq!(change_arrow(-1.0), "↓ 1.0%");
    }
}
