// src/reporting/console.rs
//! Terminal rendering of a comparison

use super::{change_arrow, row_label, significant_changes};
use crate::session::ComparisonSnapshot;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use std::fmt::Write;

pub const NO_CHANGES: &str = "無顯著變化";

/// Summary list, then one section per table that differs
pub fn render_console(snapshot: &ComparisonSnapshot, detail_threshold: f64) -> String {
    let result = &snapshot.result;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} {} {}",
        "Comparing".bold(),
        snapshot.left.title.cyan(),
        "→".bold(),
        snapshot.right.title.cyan()
    );

    let _ = writeln!(out, "\n{}", "摘要".bold().underline());
    if result.summary.is_empty() {
        let _ = writeln!(out, "  {}", NO_CHANGES.dimmed());
    }
    for line in &result.summary {
        let _ = writeln!(out, "  • {}", line);
    }

    for (name, diff) in result.table_diffs.iter() {
        if diff.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", name.bold());

        if !diff.added.is_empty() {
            let labels: Vec<&str> = diff.added.iter().map(row_label).collect();
            let _ = writeln!(out, "  {} {}", "新增：".green().bold(), labels.join("、"));
        }
        if !diff.removed.is_empty() {
            let labels: Vec<&str> = diff.removed.iter().map(row_label).collect();
            let _ = writeln!(out, "  {} {}", "移除：".red().bold(), labels.join("、"));
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["項目", "欄位", "原值", "新值", "變化"]);
        let mut listed = 0;
        for change in significant_changes(diff, detail_threshold) {
            listed += 1;
            let pct = change.numeric_change.unwrap_or(0.0);
            let color = if pct > 0.0 { Color::Green } else { Color::Red };
            table.add_row(vec![
                Cell::new(&change.row),
                Cell::new(&change.column),
                Cell::new(change.old_value.as_deref().unwrap_or("-")),
                Cell::new(change.new_value.as_deref().unwrap_or("-")),
                Cell::new(change_arrow(pct)).fg(color),
            ]);
        }
        if listed > 0 {
            let _ = writeln!(out, "{table}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonResult, Report, TableDiff, ValueChange};

    fn snapshot(result: ComparisonResult) -> ComparisonSnapshot {
        ComparisonSnapshot {
            left: Report {
                title: "五月".to_string(),
                ..Default::default()
            },
            right: Report {
                title: "六月".to_string(),
                ..Default::default()
            },
            result,
        }
    }

    #[test]
    fn test_unchanged_comparison_says_so() {
        let out = render_console(&snapshot(ComparisonResult::default()), 1.0);

        assert!(out.contains(NO_CHANGES));
        assert!(out.contains("五月"));
        assert!(out.contains("六月"));
    }

    #[test]
    fn test_changes_are_listed() {
        let mut result = ComparisonResult::default();
        result.summary.push("钙片: ↑ 50.0%".to_string());
        result.table_diffs.insert(
            "成分",
            TableDiff {
                name: "成分".to_string(),
                added: vec![[("品名", "鱼油".to_string())].into_iter().collect()],
                removed: vec![],
                changes: vec![ValueChange {
                    row: "钙片".to_string(),
                    column: "合計".to_string(),
                    old_value: Some("100".to_string()),
                    new_value: Some("150".to_string()),
                    numeric_change: Some(50.0),
                }],
            },
        );

        let out = render_console(&snapshot(result), 1.0);

        assert!(out.contains("钙片: ↑ 50.0%"));
        assert!(out.contains("鱼油"));
        assert!(out.contains("150"));
        assert!(!out.contains(NO_CHANGES));
    }
}
