//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A news item read from a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline in the source language
    pub title: String,
    /// Link to the article, stable across runs
    pub url: String,
    /// Human-readable label of the originating feed
    pub source: String,
    /// Categories supplied by the feed, in feed order
    #[serde(default)]
    pub raw_categories: Vec<String>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            raw_categories: vec![],
        }
    }
}

/// A configured feed to poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

/// Persisted history entry for a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub url: String,
    /// Display title; empty for rows written before titles were tracked
    pub title: String,
    /// `None` for legacy rows whose age is unknown
    #[serde(with = "time::serde::rfc3339::option")]
    pub posted_at: Option<OffsetDateTime>,
}

/// Aggregate counts over the history store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: u64,
    pub timestamped: u64,
    pub untimestamped: u64,
}

/// Parameters of a near-duplicate lookup against history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWindow {
    /// Minimum score on the 0-100 scale
    pub threshold: f64,
    /// Only records posted within this many hours are compared
    pub hours: u32,
    /// Upper bound on rows scanned per lookup
    pub scan_limit: u32,
}

impl Default for SimilarityWindow {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            hours: 24,
            scan_limit: 5000,
        }
    }
}

/// Content handed to a publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    pub summary: String,
    pub url: String,
    pub source: String,
    pub tags: Vec<String>,
}

/// Why an article was not published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a title already posted in a previous run
    CrossRunDuplicate { matched: String },
    /// Matched a title accepted earlier in the same run
    BatchDuplicate { matched: String },
}

/// Outcome for a single article that reached translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Published to the primary channel
    Published {
        title: String,
        tags: Vec<String>,
        /// Whether the secondary channel also received it
        secondary: bool,
    },
    /// Dry run: would have been published
    Previewed { title: String, tags: Vec<String> },
    /// Deliberately not published
    Skipped { reason: SkipReason },
    /// Processing stopped before the primary post succeeded
    Failed { error: String },
}

/// Summary of one pipeline pass
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Articles returned by the feed source
    pub fetched: usize,
    /// Articles dropped by ignore patterns
    pub ignored: usize,
    /// Articles dropped because an earlier feed carried the same URL
    pub repeated_urls: usize,
    /// Articles already present in history
    pub already_seen: usize,
    /// Per-URL outcomes, in processing order
    pub outcomes: Vec<(String, ArticleOutcome)>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            fetched: 0,
            ignored: 0,
            repeated_urls: 0,
            already_seen: 0,
            outcomes: vec![],
        }
    }

    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ArticleOutcome::Published { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ArticleOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ArticleOutcome::Failed { .. }))
            .count()
    }

    /// Outcome recorded for a URL, if it reached translation
    pub fn outcome(&self, url: &str) -> Option<&ArticleOutcome> {
        self.outcomes
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, outcome)| outcome)
    }
}
