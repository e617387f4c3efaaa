// src/search.rs
//! Report search index
//!
//! Fuzzy lookup over the generated `search-index.json`. Each record is
//! scored per key with a weight; a key matches when it contains the query
//! or a window of it is close enough by normalized Levenshtein distance.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const MIN_QUERY_CHARS: usize = 2;
pub const DEFAULT_LIMIT: usize = 10;
/// Minimum similarity for a key to count as matched
const MATCH_SIMILARITY: f64 = 0.7;
const EXCERPT_BEFORE: usize = 30;
const EXCERPT_AFTER: usize = 50;
const EXCERPT_FALLBACK: usize = 100;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search index parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Search index unreadable: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: String,
    pub title: String,
    pub mode: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKey {
    Title,
    Highlights,
    Content,
    Mode,
}

impl SearchKey {
    const ALL: [SearchKey; 4] = [Self::Title, Self::Highlights, Self::Content, Self::Mode];

    pub fn weight(self) -> f64 {
        match self {
            Self::Title => 0.4,
            Self::Highlights => 0.3,
            Self::Content => 0.2,
            Self::Mode => 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit<'a> {
    pub record: &'a SearchRecord,
    pub score: f64,
    pub matched_key: SearchKey,
    /// Char offset of the hit inside `content`, when content matched
    #[serde(skip)]
    content_offset: Option<usize>,
}

impl SearchHit<'_> {
    /// Short context for the hit: content around the match, the first two
    /// highlights, or the start of the content
    pub fn excerpt(&self) -> String {
        let content: Vec<char> = self.record.content.chars().collect();

        if let Some(offset) = self.content_offset {
            let start = offset.saturating_sub(EXCERPT_BEFORE);
            let end = (offset + EXCERPT_AFTER).min(content.len());
            let mut excerpt: String = content[start..end].iter().collect();
            if start > 0 {
                excerpt.insert_str(0, "...");
            }
            if end < content.len() {
                excerpt.push_str("...");
            }
            return excerpt;
        }

        if self.matched_key == SearchKey::Highlights && !self.record.highlights.is_empty() {
            return self
                .record
                .highlights
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ");
        }

        if content.is_empty() {
            return String::new();
        }
        let head: String = content.iter().take(EXCERPT_FALLBACK).collect();
        format!("{}...", head)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    records: Vec<SearchRecord>,
}

impl SearchIndex {
    pub fn new(records: Vec<SearchRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self, SearchError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SearchError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best `limit` records for `query`, highest score first
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit<'_>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .filter_map(|record| score_record(record, &query))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

fn score_record<'a>(record: &'a SearchRecord, query: &str) -> Option<SearchHit<'a>> {
    let mut score = 0.0;
    let mut best: Option<(SearchKey, f64)> = None;
    let mut content_offset = None;

    for key in SearchKey::ALL {
        let found = match key {
            SearchKey::Title => field_match(&record.title, query),
            SearchKey::Mode => field_match(&record.mode, query),
            SearchKey::Content => field_match(&record.content, query),
            SearchKey::Highlights => record
                .highlights
                .iter()
                .filter_map(|h| field_match(h, query))
                .max_by(|a, b| a.0.total_cmp(&b.0)),
        };
        let Some((similarity, offset)) = found else {
            continue;
        };

        let weighted = similarity * key.weight();
        score += weighted;
        if key == SearchKey::Content {
            content_offset = Some(offset);
        }
        if best.map_or(true, |(_, w)| weighted > w) {
            best = Some((key, weighted));
        }
    }

    let (matched_key, _) = best?;
    Some(SearchHit {
        record,
        score,
        matched_key,
        content_offset,
    })
}

/// Similarity and char offset of the best match of `query` in `text`
fn field_match(text: &str, query: &str) -> Option<(f64, usize)> {
    let haystack: Vec<char> = text
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect();
    let needle: Vec<char> = query.chars().collect();
    if haystack.is_empty() {
        return None;
    }

    if let Some(pos) = haystack.windows(needle.len()).position(|w| w == needle.as_slice()) {
        return Some((1.0, pos));
    }

    let width = needle.len().min(haystack.len());
    let mut best = (0.0, 0);
    for (pos, window) in haystack.windows(width).enumerate() {
        let candidate: String = window.iter().collect();
        let similarity = strsim::normalized_levenshtein(&candidate, query);
        if similarity > best.0 {
            best = (similarity, pos);
        }
    }

    (best.0 >= MATCH_SIMILARITY).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"[
        {"id": "daily/2024-06-01", "title": "每日報告 2024-06-01", "mode": "daily",
         "date": "2024-06-01", "content": "本日新增鈣片產品 12 項，魚油產品數量持平。",
         "highlights": ["鈣片成長", "魚油持平"]},
        {"id": "weekly/2024-W22", "title": "Weekly Report", "mode": "weekly",
         "content": "Probiotics lead the week with strong growth in Japan.",
         "highlights": []},
        {"id": "monthly/2024-05", "title": "Monthly Report", "mode": "monthly",
         "content": "", "highlights": ["Collagen surge"]}
    ]"#;

    #[test]
    fn test_from_json_and_malformed() {
        let index = SearchIndex::from_json(INDEX).unwrap();
        assert_eq!(index.len(), 3);

        let err = SearchIndex::from_json("{not json").unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn test_short_query_returns_nothing() {
        let index = SearchIndex::from_json(INDEX).unwrap();
        assert!(index.search("鈣", DEFAULT_LIMIT).is_empty());
        assert!(index.search(" a ", DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_title_match_outranks_content_match() {
        let index = SearchIndex::from_json(INDEX).unwrap();

        let hits = index.search("weekly", DEFAULT_LIMIT);

        assert_eq!(hits[0].record.id, "weekly/2024-W22");
        assert_eq!(hits[0].matched_key, SearchKey::Title);
    }

    #[test]
    fn test_fuzzy_match_tolerates_typo() {
        let index = SearchIndex::from_json(INDEX).unwrap();

        let hits = index.search("probiotcs", DEFAULT_LIMIT);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "weekly/2024-W22");
    }

    #[test]
    fn test_limit_applied() {
        let index = SearchIndex::from_json(INDEX).unwrap();
        assert_eq!(index.search("report", 1).len(), 1);
    }

    #[test]
    fn test_excerpt_variants() {
        let index = SearchIndex::from_json(INDEX).unwrap();

        let hits = index.search("魚油", DEFAULT_LIMIT);
        assert_eq!(hits[0].excerpt(), "本日新增鈣片產品 12 項，魚油產品數量持平。");

        let hits = index.search("collagen", DEFAULT_LIMIT);
        assert_eq!(hits[0].excerpt(), "Collagen surge");
    }

    #[test]
    fn test_excerpt_marks_truncation() {
        let record = SearchRecord {
            id: "x".to_string(),
            title: "x".to_string(),
            mode: "daily".to_string(),
            date: None,
            content: format!("{}needle{}", "a".repeat(60), "b".repeat(80)),
            highlights: Vec::new(),
        };
        let index = SearchIndex::new(vec![record]);

        let hits = index.search("needle", DEFAULT_LIMIT);
        let excerpt = hits[0].excerpt();

        assert!(excerpt.starts_with("..."));
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.contains("needle"));
    }
}
