// src/collect/types.rs
use chrono::{DateTime, Duration, FixedOffset};

use crate::retry::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Academic,
    News,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Academic => "academic",
            SourceCategory::News => "news",
        }
    }
}

/// Category-specific payload, opaque to scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordExtra {
    Paper {
        authors: Vec<String>,
        categories: Vec<String>,
    },
    News {
        feed_url: String,
    },
}

/// One discovered item prior to scoring/ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Canonical URL or source entry id. Unique within one run's output.
    pub identity_key: String,
    pub title: String,
    pub summary_text: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub updated_at: Option<DateTime<FixedOffset>>,
    /// Raw date text as fetched, kept for the report when parsing fails.
    pub published_text: Option<String>,
    pub category: SourceCategory,
    pub extra: RecordExtra,
}

/// Lookback window anchored at the pipeline's authoritative "now".
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    pub now: DateTime<FixedOffset>,
    pub lookback_days: i64,
}

impl FetchWindow {
    pub fn new(now: DateTime<FixedOffset>, lookback_days: i64) -> Self {
        Self { now, lookback_days }
    }

    pub fn cutoff(&self) -> DateTime<FixedOffset> {
        self.now - Duration::days(self.lookback_days)
    }

    /// A record passes if *either* timestamp is on or after the cutoff date
    /// (inclusive union). Comparison is by calendar date in the report time
    /// zone. Records with no parseable timestamp at all: papers are dropped
    /// (arXiv always carries `published`), news entries are kept with their
    /// raw date text.
    pub fn admits(&self, rec: &CandidateRecord) -> bool {
        let cutoff = self.cutoff().date_naive();
        let pub_ok = rec.published_at.map(|d| d.date_naive() >= cutoff);
        let upd_ok = rec.updated_at.map(|d| d.date_naive() >= cutoff);
        match (pub_ok, upd_ok) {
            (None, None) => rec.category == SourceCategory::News,
            _ => pub_ok.unwrap_or(false) || upd_ok.unwrap_or(false),
        }
    }
}

/// One external system that yields raw candidate records.
/// `Err` after internal retries means the source is unavailable;
/// `Ok(vec![])` is a successful-but-empty fetch, not an error.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<CandidateRecord>, FetchError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn record(published: Option<&str>, updated: Option<&str>, cat: SourceCategory) -> CandidateRecord {
        let parse = |s: &str| {
            let d = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
            offset()
                .with_ymd_and_hms(d.year(), d.month(), d.day(), 12, 0, 0)
                .unwrap()
        };
        CandidateRecord {
            identity_key: "k".into(),
            title: "t".into(),
            summary_text: "s".into(),
            published_at: published.map(parse),
            updated_at: updated.map(parse),
            published_text: None,
            category: cat,
            extra: match cat {
                SourceCategory::Academic => RecordExtra::Paper {
                    authors: vec![],
                    categories: vec![],
                },
                SourceCategory::News => RecordExtra::News {
                    feed_url: "f".into(),
                },
            },
        }
    }

    fn window() -> FetchWindow {
        let now = offset().with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        FetchWindow::new(now, 2)
    }

    #[test]
    fn boundary_date_is_inclusive() {
        let w = window();
        assert!(w.admits(&record(Some("2024-01-08"), None, SourceCategory::Academic)));
        assert!(!w.admits(&record(Some("2024-01-07"), None, SourceCategory::Academic)));
    }

    #[test]
    fn either_timestamp_admits_union_not_intersection() {
        let w = window();
        // stale publish, fresh update -> kept
        assert!(w.admits(&record(
            Some("2023-12-01"),
            Some("2024-01-09"),
            SourceCategory::Academic
        )));
        // fresh publish, stale update -> kept
        assert!(w.admits(&record(
            Some("2024-01-09"),
            Some("2023-12-01"),
            SourceCategory::Academic
        )));
        // both stale -> dropped
        assert!(!w.admits(&record(
            Some("2023-12-01"),
            Some("2023-12-02"),
            SourceCategory::Academic
        )));
    }

    #[test]
    fn undated_news_is_kept_undated_paper_is_not() {
        let w = window();
        assert!(w.admits(&record(None, None, SourceCategory::News)));
        assert!(!w.admits(&record(None, None, SourceCategory::Academic)));
    }
}
