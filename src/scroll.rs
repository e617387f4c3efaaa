// src/scroll.rs
//! Scroll Synchronizer
//!
//! Keeps two rendered report panels approximately aligned. Each panel's
//! h1-h4 outline is indexed as (normalized text, offset); scrolling one
//! panel moves the other to the same position within the matching section,
//! or proportionally when the source has no current section at all.
//!
//! The heading maps are a snapshot of panel layout, not owned by it: call
//! `rebuild` whenever panel content changes.

use crate::config::ScrollConfig;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Scroll state of a rendered panel, provided by the host UI
pub trait ScrollPanel {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&mut self, value: f64);
    fn scroll_height(&self) -> f64;
    fn client_height(&self) -> f64;
    /// h1-h4 headings in document order as (raw text, vertical offset)
    fn headings(&self) -> Vec<(String, f64)>;
}

/// Which of the two panels fired the scroll event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Normalize heading text for cross-document matching.
///
/// Trims, collapses whitespace, drops a trailing dash + year suffix
/// ("Overview — 2024-05" and "Overview - 2024-06" both become "overview")
/// and lower-cases.
pub fn normalize_heading(text: &str) -> String {
    static DATE_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = DATE_SUFFIX.get_or_init(|| Regex::new(r"[—–-]\s*\d{4}.*$").unwrap());

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    re.replace(&collapsed, "").trim().to_lowercase()
}

/// Normalized h1-h4 outline of a rendered content blob
pub fn outline_from_html(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("h1, h2, h3, h4") else {
        return Vec::new();
    };

    fragment
        .select(&selector)
        .map(|h| normalize_heading(&h.text().collect::<String>()))
        .collect()
}

/// Headings present in both outlines, in left order
pub fn shared_sections(left: &[String], right: &[String]) -> Vec<String> {
    left.iter()
        .filter(|h| !h.is_empty() && right.contains(h))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingAnchor {
    pub text: String,
    pub offset: f64,
}

/// Ordered heading anchors of one panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingMap {
    anchors: Vec<HeadingAnchor>,
}

impl HeadingMap {
    pub fn build<I, S>(headings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            anchors: headings
                .into_iter()
                .map(|(text, offset)| HeadingAnchor {
                    text: normalize_heading(text.as_ref()),
                    offset,
                })
                .collect(),
        }
    }

    pub fn from_panel(panel: &dyn ScrollPanel) -> Self {
        Self::build(panel.headings())
    }

    /// Last heading at or above `position`
    pub fn current_section(&self, position: f64) -> Option<&HeadingAnchor> {
        self.anchors.iter().rev().find(|a| a.offset <= position)
    }

    pub fn find(&self, text: &str) -> Option<&HeadingAnchor> {
        self.anchors.iter().find(|a| a.text == text)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Suppresses the mirrored panel's own scroll events for a short while.
///
/// Released after a fixed delay, not when the target finishes moving.
#[derive(Debug, Clone)]
pub struct ScrollGuard {
    hold: Duration,
    engaged_at: Option<Instant>,
}

impl ScrollGuard {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            engaged_at: None,
        }
    }

    pub fn engage(&mut self, now: Instant) {
        self.engaged_at = Some(now);
    }

    pub fn is_engaged(&self, now: Instant) -> bool {
        match self.engaged_at {
            Some(at) => now.saturating_duration_since(at) < self.hold,
            None => false,
        }
    }
}

/// What a scroll event did to the target panel
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Guard held or sync disabled; target untouched
    Suppressed,
    /// Target moved to the same offset within the matching section
    Anchored { heading: String, target_top: f64 },
    /// No current section in the source; target moved by ratio
    Proportional { ratio: f64, target_top: f64 },
    /// Current section has no counterpart in the target; target untouched
    Unmatched { heading: String },
}

pub struct ScrollSynchronizer {
    left: HeadingMap,
    right: HeadingMap,
    guard: ScrollGuard,
    lookahead: f64,
    enabled: bool,
}

impl ScrollSynchronizer {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            left: HeadingMap::default(),
            right: HeadingMap::default(),
            guard: ScrollGuard::new(config.guard_duration()),
            lookahead: config.lookahead,
            enabled: true,
        }
    }

    /// Re-index both panels' headings
    pub fn rebuild(&mut self, left: &dyn ScrollPanel, right: &dyn ScrollPanel) {
        self.left = HeadingMap::from_panel(left);
        self.right = HeadingMap::from_panel(right);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Handle a scroll event fired by `source` (on `side`), moving `target`
    pub fn on_scroll(
        &mut self,
        side: Side,
        source: &dyn ScrollPanel,
        target: &mut dyn ScrollPanel,
        now: Instant,
    ) -> SyncOutcome {
        if !self.enabled || self.guard.is_engaged(now) {
            return SyncOutcome::Suppressed;
        }

        let (source_map, target_map) = match side {
            Side::Left => (&self.left, &self.right),
            Side::Right => (&self.right, &self.left),
        };

        let scroll_top = source.scroll_top();

        let Some(current) = source_map.current_section(scroll_top + self.lookahead) else {
            let ratio = scroll_ratio(source);
            let target_top = ratio * (target.scroll_height() - target.client_height());
            target.set_scroll_top(target_top);
            self.guard.engage(now);
            return SyncOutcome::Proportional { ratio, target_top };
        };

        match target_map.find(&current.text) {
            Some(matching) => {
                let target_top = matching.offset + (scroll_top - current.offset);
                target.set_scroll_top(target_top);
                let heading = current.text.clone();
                self.guard.engage(now);
                SyncOutcome::Anchored { heading, target_top }
            }
            None => SyncOutcome::Unmatched {
                heading: current.text.clone(),
            },
        }
    }
}

/// scrollTop / (scrollHeight - clientHeight); 0 when the panel cannot scroll
fn scroll_ratio(panel: &dyn ScrollPanel) -> f64 {
    let range = panel.scroll_height() - panel.client_height();
    if range > 0.0 {
        panel.scroll_top() / range
    } else {
        0.0
    }
}
