// src/session.rs
//! Comparison Session
//!
//! Explicit context for one comparison view: the loader, the configuration,
//! the `left`/`right` selection (mirrored in the page URL query) and the
//! latest completed comparison. A new comparison replaces the snapshot
//! wholesale; a failed one leaves the previous snapshot in place.

use crate::analysis::ChangeAggregator;
use crate::config::CompareConfig;
use crate::loader::{CompareError, ReportLoader};
use crate::models::{ComparisonResult, Report};
use log::{info, warn};
use std::sync::Arc;
use url::Url;

/// Report pair selected for comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelection {
    pub left: Option<String>,
    pub right: Option<String>,
}

impl QuerySelection {
    pub fn new(left: &str, right: &str) -> Self {
        Self {
            left: Some(left.to_string()),
            right: Some(right.to_string()),
        }
    }

    /// Read `left` and `right` from a page URL
    pub fn from_url(url: &Url) -> Self {
        let mut selection = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "left" if !value.is_empty() => selection.left = Some(value.into_owned()),
                "right" if !value.is_empty() => selection.right = Some(value.into_owned()),
                _ => {}
            }
        }
        selection
    }

    /// `left=...&right=...`, percent-encoded
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(left) = &self.left {
            parts.push(format!("left={}", urlencoding::encode(left)));
        }
        if let Some(right) = &self.right {
            parts.push(format!("right={}", urlencoding::encode(right)));
        }
        parts.join("&")
    }

    /// Page URL for a shareable link to this comparison
    pub fn apply_to(&self, page: &Url) -> Url {
        let mut url = page.clone();
        let query = self.to_query_string();
        url.set_query(if query.is_empty() { None } else { Some(query.as_str()) });
        url
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Both sides chosen and not the same report
    pub fn is_comparable(&self) -> bool {
        match (&self.left, &self.right) {
            (Some(l), Some(r)) => l != r,
            _ => false,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }
}

/// Reports and result of one completed comparison
#[derive(Debug, Clone)]
pub struct ComparisonSnapshot {
    pub left: Report,
    pub right: Report,
    pub result: ComparisonResult,
}

pub struct CompareSession {
    loader: ReportLoader,
    config: CompareConfig,
    selection: QuerySelection,
    snapshot: Option<Arc<ComparisonSnapshot>>,
}

impl CompareSession {
    pub fn new(loader: ReportLoader, config: CompareConfig) -> Self {
        Self {
            loader,
            config,
            selection: QuerySelection::default(),
            snapshot: None,
        }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn selection(&self) -> &QuerySelection {
        &self.selection
    }

    pub fn select(&mut self, selection: QuerySelection) {
        self.selection = selection;
    }

    /// Latest successful comparison
    pub fn snapshot(&self) -> Option<Arc<ComparisonSnapshot>> {
        self.snapshot.clone()
    }

    /// Retrieve both reports and compare them.
    ///
    /// Any retrieval failure aborts the whole comparison; nothing partial is
    /// kept and no retry is attempted.
    pub async fn compare(&mut self, left: &str, right: &str) -> Result<Arc<ComparisonSnapshot>, CompareError> {
        self.selection = QuerySelection::new(left, right);
        info!("Comparing {} with {}", left, right);

        let (left_report, right_report) = match self.loader.load_pair(left, right).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Comparison abandoned: {}", e);
                return Err(e.into());
            }
        };

        let result = ChangeAggregator::new(&self.config).compare(&left_report, &right_report);

        let snapshot = Arc::new(ComparisonSnapshot {
            left: left_report,
            right: right_report,
            result,
        });
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Compare whatever the current selection names
    pub async fn compare_selection(&mut self) -> Option<Result<Arc<ComparisonSnapshot>, CompareError>> {
        let (left, right) = match (&self.selection.left, &self.selection.right) {
            (Some(l), Some(r)) => (l.clone(), r.clone()),
            _ => return None,
        };
        Some(self.compare(&left, &right).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_url() {
        let url = Url::parse("http://localhost:8000/compare.html?left=monthly%2F2024-05&right=monthly%2F2024-06").unwrap();
        let selection = QuerySelection::from_url(&url);

        assert_eq!(selection.left.as_deref(), Some("monthly/2024-05"));
        assert_eq!(selection.right.as_deref(), Some("monthly/2024-06"));
        assert!(selection.is_comparable());
    }

    #[test]
    fn test_selection_query_round_trip() {
        let selection = QuerySelection::new("週報/第1週", "週報/第2週");
        let page = Url::parse("http://localhost:8000/compare.html").unwrap();

        let url = selection.apply_to(&page);
        assert_eq!(QuerySelection::from_url(&url), selection);
    }

    #[test]
    fn test_selection_rules() {
        let mut selection = QuerySelection::new("a", "a");
        assert!(selection.is_complete());
        assert!(!selection.is_comparable());

        selection.right = Some("b".to_string());
        selection.swap();
        assert_eq!(selection.left.as_deref(), Some("b"));
        assert_eq!(selection.right.as_deref(), Some("a"));

        let partial = QuerySelection {
            left: Some("a".to_string()),
            right: None,
        };
        assert!(!partial.is_complete());
        assert!(!partial.is_comparable());
        assert_eq!(partial.to_query_string(), "left=a");
    }
}
