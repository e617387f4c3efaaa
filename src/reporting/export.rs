// src/reporting/export.rs
//! JSON export of a comparison for downstream tooling

use crate::chart_data::{trend_points, TrendPoint};
use crate::models::{ComparisonResult, OrderedMap, Report};
use crate::session::ComparisonSnapshot;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Identity of one compared report
#[derive(Debug, Clone, Serialize)]
pub struct ReportRef<'a> {
    pub identifier: &'a str,
    pub title: &'a str,
    pub metadata: &'a OrderedMap<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonExport<'a> {
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
    pub left: ReportRef<'a>,
    pub right: ReportRef<'a>,
    pub result: &'a ComparisonResult,
    pub trend_chart: Vec<TrendPoint>,
}

impl<'a> ComparisonExport<'a> {
    pub fn from_snapshot(snapshot: &'a ComparisonSnapshot) -> Self {
        let reference = |r: &'a Report| ReportRef {
            identifier: &r.identifier,
            title: &r.title,
            metadata: &r.metadata,
        };

        Self {
            generated_at: Utc::now().to_rfc3339(),
            left: reference(&snapshot.left),
            right: reference(&snapshot.right),
            result: &snapshot.result,
            trend_chart: trend_points(&snapshot.result.trend),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize comparison")
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;

        file.write_all(json.as_bytes())
            .context("Failed to write comparison export")?;

        Ok(())
    }
}
