// src/reporting/html.rs
//! HTML fragments for the side-by-side comparison page

use super::{change_arrow, row_label, significant_changes};
use crate::chart_data::trend_points;
use crate::models::ComparisonResult;
use crate::reporting::console::NO_CHANGES;
use crate::session::ComparisonSnapshot;
use anyhow::{Context, Result};
use std::fmt::Write;

pub const NO_DIFFERENCES: &str = "報告結構相同，無明顯差異";

/// Escape text for HTML element content and attribute values
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// `<li>` items for the summary list
pub fn render_summary_list(result: &ComparisonResult) -> String {
    if result.summary.is_empty() {
        return format!("<li>{}</li>", NO_CHANGES);
    }
    result
        .summary
        .iter()
        .map(|s| format!("<li>{}</li>", escape_html(s)))
        .collect()
}

/// Per-table added/removed/changed sections
pub fn render_detailed_diff(result: &ComparisonResult, detail_threshold: f64) -> String {
    let mut html = String::new();

    for (name, diff) in result.table_diffs.iter() {
        if diff.is_empty() {
            continue;
        }
        let _ = write!(html, "<h4>{}</h4>", escape_html(name));

        if !diff.added.is_empty() {
            html.push_str(r#"<div class="diff-section diff-added"><strong>新增：</strong><ul>"#);
            for row in &diff.added {
                let _ = write!(html, "<li>{}</li>", escape_html(row_label(row)));
            }
            html.push_str("</ul></div>");
        }

        if !diff.removed.is_empty() {
            html.push_str(r#"<div class="diff-section diff-removed"><strong>移除：</strong><ul>"#);
            for row in &diff.removed {
                let _ = write!(html, "<li>{}</li>", escape_html(row_label(row)));
            }
            html.push_str("</ul></div>");
        }

        let significant: Vec<_> = significant_changes(diff, detail_threshold).collect();
        if !significant.is_empty() {
            html.push_str(r#"<div class="diff-section diff-changed"><strong>數值變化：</strong>"#);
            html.push_str(r#"<table class="data-table"><thead><tr>"#);
            html.push_str("<th>項目</th><th>欄位</th><th>原值</th><th>新值</th><th>變化</th>");
            html.push_str("</tr></thead><tbody>");
            for change in significant {
                let pct = change.numeric_change.unwrap_or(0.0);
                let class = if pct > 0.0 { "text-success" } else { "text-danger" };
                let _ = write!(
                    html,
                    r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class="{}">{}</td></tr>"#,
                    escape_html(&change.row),
                    escape_html(&change.column),
                    escape_html(change.old_value.as_deref().unwrap_or("")),
                    escape_html(change.new_value.as_deref().unwrap_or("")),
                    class,
                    change_arrow(pct)
                );
            }
            html.push_str("</tbody></table></div>");
        }
    }

    if html.is_empty() {
        html = format!(r#"<p class="text-muted">{}</p>"#, NO_DIFFERENCES);
    }
    html
}

/// Standalone page: both report bodies, summary, detailed diff and the
/// trend chart data as embedded JSON
pub fn render_page(snapshot: &ComparisonSnapshot, detail_threshold: f64) -> Result<String> {
    let trend = serde_json::to_string(&trend_points(&snapshot.result.trend))
        .context("Failed to serialize trend data")?
        .replace("</", "<\\/");
    let left_title = escape_html(&snapshot.left.title);
    let right_title = escape_html(&snapshot.right.title);

    let mut page = String::new();
    let _ = write!(
        page,
        concat!(
            "<!DOCTYPE html>\n<html lang=\"zh-TW\">\n<head><meta charset=\"utf-8\">",
            "<title>{} ↔ {}</title></head>\n<body>\n",
            "<div class=\"compare-panels\">",
            "<section class=\"compare-panel\"><h2 id=\"header-left\">{}</h2>",
            "<div id=\"content-left\" class=\"md-content\">{}</div></section>",
            "<section class=\"compare-panel\"><h2 id=\"header-right\">{}</h2>",
            "<div id=\"content-right\" class=\"md-content\">{}</div></section>",
            "</div>\n",
            "<ul id=\"summary-list\">{}</ul>\n",
            "<div id=\"diff-content\">{}</div>\n",
            "<script type=\"application/json\" id=\"trend-data\">{}</script>\n",
            "</body>\n</html>\n"
        ),
        left_title,
        right_title,
        left_title,
        snapshot.left.content,
        right_title,
        snapshot.right.content,
        render_summary_list(&snapshot.result),
        render_detailed_diff(&snapshot.result, detail_threshold),
        trend
    );
    Ok(page)
}
