// src/config.rs
//! Comparison Configuration
//!
//! Every heuristic the comparison relies on (DOM selectors, numeric glyphs,
//! ranking thresholds, total/aggregate markers, scroll constants) lives here
//! so it can be overridden from a YAML file and pinned down in tests.
//! The defaults reproduce the behaviour of the report site as generated.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a comparison session
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CompareConfig {
    /// Where report data lives inside a retrieved document
    pub selectors: SelectorConfig,

    /// How cell text is turned into numbers
    pub numbers: NumberFormat,

    /// Thresholds and caps for the headline and trend selections
    pub ranking: RankingConfig,

    /// Column/row role hints (totals, counts, aggregate rows)
    pub roles: ColumnRoleHints,

    /// Scroll synchronization constants
    pub scroll: ScrollConfig,

    /// HTTP retrieval settings
    pub http: HttpConfig,
}

/// DOM selectors used by the report loader
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SelectorConfig {
    /// Rendered content region
    pub content: String,
    /// Tables inside the content region
    pub tables: String,
    /// Header cells of a table
    pub header_cells: String,
    /// Data rows of a table
    pub body_rows: String,
    /// Data cells of a row
    pub data_cells: String,
    /// Metadata item wrapper
    pub meta_item: String,
    pub meta_label: String,
    pub meta_value: String,
    /// Site name appended to every `<title>`, removed when extracting the title
    pub title_suffix: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            content: ".md-content".to_string(),
            tables: ".md-content table".to_string(),
            header_cells: "thead th, tr:first-child th".to_string(),
            body_rows: "tbody tr, tr:not(:first-child)".to_string(),
            data_cells: "td".to_string(),
            meta_item: ".report-meta-item".to_string(),
            meta_label: ".report-meta-label".to_string(),
            meta_value: ".report-meta-value".to_string(),
            title_suffix: " - 保健食品情報系統".to_string(),
        }
    }
}

/// Characters removed from cell text before numeric parsing.
/// Whitespace is always removed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NumberFormat {
    pub ignored_chars: Vec<char>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            ignored_chars: vec![',', '%', '✅', '❌'],
        }
    }
}

impl NumberFormat {
    /// Strip separators, glyphs and whitespace from raw cell text
    pub fn clean(&self, raw: &str) -> String {
        raw.chars()
            .filter(|c| !c.is_whitespace() && !self.ignored_chars.contains(c))
            .collect()
    }
}

/// Ranking thresholds (percentage points) and caps
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RankingConfig {
    pub headline_threshold: f64,
    pub headline_limit: usize,
    pub trend_threshold: f64,
    pub trend_limit: usize,
    /// Minimum change listed in the per-table detail view
    pub detail_threshold: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            headline_threshold: 5.0,
            headline_limit: 5,
            trend_threshold: 0.5,
            trend_limit: 12,
            detail_threshold: 1.0,
        }
    }
}

/// Recognized column/row roles, matched by substring
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ColumnRoleHints {
    /// Marks a total/aggregate column or row (case-insensitive)
    pub total_markers: Vec<String>,
    /// Marks a count column (chart value fallback)
    pub count_markers: Vec<String>,
    /// Row labels starting with one of these are aggregate rows
    pub aggregate_prefixes: Vec<String>,
}

impl Default for ColumnRoleHints {
    fn default() -> Self {
        Self {
            total_markers: vec!["合計".to_string(), "total".to_string()],
            count_markers: vec!["產品數".to_string(), "數".to_string()],
            aggregate_prefixes: vec!["**".to_string()],
        }
    }
}

impl ColumnRoleHints {
    /// True if the text names a total/aggregate column
    pub fn is_total(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.total_markers
            .iter()
            .any(|m| lowered.contains(&m.to_lowercase()))
    }

    pub fn is_count(&self, text: &str) -> bool {
        self.count_markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// True if a row label denotes a summary line that should not be ranked
    pub fn is_aggregate_row(&self, label: &str) -> bool {
        self.is_total(label)
            || self
                .aggregate_prefixes
                .iter()
                .any(|p| label.to_lowercase().starts_with(p.as_str()))
    }
}

/// Scroll synchronization constants
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScrollConfig {
    /// Lookahead below the scroll position when picking the current section
    pub lookahead: f64,
    /// How long the mirrored panel's own scroll events are ignored
    pub guard_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            lookahead: 50.0,
            guard_ms: 50,
        }
    }
}

impl ScrollConfig {
    pub fn guard_duration(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }
}

/// HTTP retrieval settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("report-compare/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CompareConfig {
    /// Load a configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_yaml(&content)
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .with_context(|| "Failed to parse comparison config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let s = &self.selectors;
        for (name, value) in [
            ("content", &s.content),
            ("tables", &s.tables),
            ("header_cells", &s.header_cells),
            ("body_rows", &s.body_rows),
            ("data_cells", &s.data_cells),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("Selector '{}' cannot be empty", name));
            }
        }

        let r = &self.ranking;
        if r.headline_limit == 0 || r.trend_limit == 0 {
            return Err(anyhow!("Ranking limits must be greater than zero"));
        }
        if r.headline_threshold < 0.0 || r.trend_threshold < 0.0 || r.detail_threshold < 0.0 {
            return Err(anyhow!("Ranking thresholds cannot be negative"));
        }

        if self.scroll.lookahead < 0.0 {
            return Err(anyhow!("Scroll lookahead cannot be negative"));
        }

        if self.http.timeout_secs == 0 {
            return Err(anyhow!("HTTP timeout must be at least one second"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CompareConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ranking.headline_limit, 5);
        assert_eq!(config.ranking.trend_limit, 12);
        assert_eq!(config.scroll.guard_duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
ranking:
  headline_limit: 3
roles:
  total_markers: ["Sum"]
"#;
        let config = CompareConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.ranking.headline_limit, 3);
        assert_eq!(config.ranking.trend_limit, 12);
        assert_eq!(config.roles.total_markers, vec!["Sum".to_string()]);
        assert_eq!(config.selectors.content, ".md-content");
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let yaml = "ranking:\n  trend_limit: 0\n";
        assert!(CompareConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_number_format_clean() {
        let numbers = NumberFormat::default();
        assert_eq!(numbers.clean(" 1,234 % ✅"), "1234");
        assert_eq!(numbers.clean("❌ 12.5"), "12.5");
    }

    #[test]
    fn test_role_hints() {
        let hints = ColumnRoleHints::default();

        assert!(hints.is_total("合計"));
        assert!(hints.is_total("Grand TOTAL"));
        assert!(!hints.is_total("品名"));
        assert!(hints.is_aggregate_row("**小計**"));
        assert!(hints.is_aggregate_row("Total"));
        assert!(!hints.is_aggregate_row("钙片"));
        assert!(hints.is_count("產品數"));
    }
}
