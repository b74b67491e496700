// src/collect/providers/arxiv.rs
//! arXiv adapters. `ArxivApiSource` issues one composite boolean query;
//! `ArxivSplitSource` is the fallback that splits the same corpus into one
//! simple `cat:` query per category and merges the results.

use async_trait::async_trait;
use chrono::FixedOffset;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::collect::normalize_text;
use crate::collect::providers::http_get_text;
use crate::collect::types::{CandidateRecord, FetchWindow, RecordExtra, SourceAdapter, SourceCategory};
use crate::config::{AcademicSection, HttpSection};
use crate::retry::{FetchError, RetryPolicy};

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// Build the composite boolean query: `cat:` clauses for every category plus
/// `ti:` clauses for title keywords (phrases quoted), all OR-ed.
pub fn build_composite_query(categories: &[String], title_keywords: &[String]) -> String {
    let mut clauses: Vec<String> = categories.iter().map(|c| format!("cat:{c}")).collect();
    for kw in title_keywords {
        if kw.contains(' ') {
            clauses.push(format!("ti:\"{kw}\""));
        } else {
            clauses.push(format!("ti:{kw}"));
        }
    }
    clauses.join(" OR ")
}

/// Parse an arXiv Atom payload into candidate records. Entries missing an id
/// or a title are skipped individually; a payload that is not Atom at all is
/// a permanent failure.
pub fn parse_atom(xml: &str, tz: FixedOffset) -> Result<Vec<CandidateRecord>, FetchError> {
    let feed: AtomFeed = from_str(xml)
        .map_err(|e| FetchError::Permanent(anyhow::anyhow!("parsing arxiv atom: {e}")))?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let (id, title) = match (entry.id, entry.title) {
            (Some(id), Some(title)) if !id.trim().is_empty() && !title.trim().is_empty() => {
                (id, title)
            }
            _ => {
                debug!(target: "collect", "skipping atom entry without id/title");
                continue;
            }
        };
        let parse_date = |s: &Option<String>| {
            s.as_deref()
                .and_then(|v| chrono::DateTime::parse_from_rfc3339(v).ok())
                .map(|dt| dt.with_timezone(&tz))
        };
        out.push(CandidateRecord {
            identity_key: id.trim().to_string(),
            title: normalize_text(&title),
            summary_text: normalize_text(entry.summary.as_deref().unwrap_or_default()),
            published_at: parse_date(&entry.published),
            updated_at: parse_date(&entry.updated),
            published_text: entry.published.clone(),
            category: SourceCategory::Academic,
            extra: RecordExtra::Paper {
                authors: entry.authors.into_iter().filter_map(|a| a.name).collect(),
                categories: entry
                    .categories
                    .into_iter()
                    .filter_map(|c| c.term)
                    .collect(),
            },
        });
    }
    Ok(out)
}

enum Mode {
    /// Raw Atom body, for tests. Owned copy so fixtures need not be 'static.
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

/// Primary academic source: one composite query, page capped at
/// `max_results`, newest submissions first, retried per policy.
pub struct ArxivApiSource {
    mode: Mode,
    query: String,
    max_results: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ArxivApiSource {
    pub fn new(academic: &AcademicSection, http: &HttpSection, retry: RetryPolicy) -> Self {
        Self {
            mode: Mode::Http {
                url: academic.api_url.clone(),
                client: reqwest::Client::new(),
            },
            query: build_composite_query(&academic.categories, &academic.title_keywords),
            max_results: academic.max_results,
            timeout: http.timeout(),
            retry,
        }
    }

    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            query: String::new(),
            max_results: 50,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl SourceAdapter for ArxivApiSource {
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<CandidateRecord>, FetchError> {
        let t0 = std::time::Instant::now();

        let body = match &self.mode {
            Mode::Fixture(xml) => xml.clone(),
            Mode::Http { url, client } => {
                let max = self.max_results.to_string();
                let params = [
                    ("search_query", self.query.as_str()),
                    ("start", "0"),
                    ("max_results", max.as_str()),
                    ("sortBy", "submittedDate"),
                    ("sortOrder", "descending"),
                ];
                self.retry
                    .run(self.name(), || {
                        http_get_text(client, url, &params, self.timeout)
                    })
                    .await?
            }
        };

        let mut records = parse_atom(&body, window.now.timezone())?;
        let fetched = records.len();
        records.retain(|r| window.admits(r));

        histogram!("digest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("digest_records_fetched_total").increment(fetched as u64);
        debug!(
            target: "collect",
            source = self.name(),
            fetched,
            kept = records.len(),
            "arxiv api fetch"
        );
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "arxiv-api"
    }
}

enum SplitMode {
    /// One Atom body per sub-query, for tests.
    Fixtures(Vec<String>),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

/// Fallback academic source: one `cat:<code>` query per configured category.
/// Sub-query failures are skipped; the adapter fails only when every
/// sub-query fails. Results are merged and deduplicated by identity key.
pub struct ArxivSplitSource {
    mode: SplitMode,
    categories: Vec<String>,
    max_results: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ArxivSplitSource {
    pub fn new(academic: &AcademicSection, http: &HttpSection, retry: RetryPolicy) -> Self {
        Self {
            mode: SplitMode::Http {
                url: academic.api_url.clone(),
                client: reqwest::Client::new(),
            },
            categories: academic.categories.clone(),
            max_results: academic.max_results,
            timeout: http.timeout(),
            retry,
        }
    }

    pub fn from_fixtures(bodies: Vec<String>) -> Self {
        Self {
            mode: SplitMode::Fixtures(bodies),
            categories: Vec::new(),
            max_results: 50,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    async fn sub_query_bodies(&self) -> Result<Vec<String>, FetchError> {
        match &self.mode {
            SplitMode::Fixtures(bodies) => Ok(bodies.clone()),
            SplitMode::Http { url, client } => {
                let mut bodies = Vec::with_capacity(self.categories.len());
                let mut last_err: Option<FetchError> = None;
                let max = self.max_results.to_string();
                for cat in &self.categories {
                    let query = format!("cat:{cat}");
                    let params = [
                        ("search_query", query.as_str()),
                        ("start", "0"),
                        ("max_results", max.as_str()),
                        ("sortBy", "submittedDate"),
                        ("sortOrder", "descending"),
                    ];
                    match self
                        .retry
                        .run(self.name(), || {
                            http_get_text(client, url, &params, self.timeout)
                        })
                        .await
                    {
                        Ok(body) => bodies.push(body),
                        Err(e) => {
                            warn!(
                                target: "collect",
                                source = self.name(),
                                category = %cat,
                                error = %e,
                                "sub-query failed, skipping"
                            );
                            last_err = Some(e);
                        }
                    }
                }
                if bodies.is_empty() {
                    return Err(last_err
                        .unwrap_or_else(|| FetchError::permanent("no categories configured")));
                }
                Ok(bodies)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for ArxivSplitSource {
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<CandidateRecord>, FetchError> {
        let bodies = self.sub_query_bodies().await?;

        // Merge sub-query results; the same paper can appear under several
        // categories, so dedup by identity key before returning. A bad body
        // from one sub-query must not sink the others.
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();
        for body in &bodies {
            match parse_atom(body, window.now.timezone()) {
                Ok(recs) => {
                    for rec in recs {
                        if seen.insert(rec.identity_key.clone()) {
                            merged.push(rec);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        target: "collect",
                        source = self.name(),
                        error = %e,
                        "unparseable sub-query payload, skipping"
                    );
                }
            }
        }

        let fetched = merged.len();
        merged.retain(|r| window.admits(r));
        counter!("digest_records_fetched_total").increment(fetched as u64);
        debug!(
            target: "collect",
            source = self.name(),
            fetched,
            kept = merged.len(),
            "arxiv split fetch"
        );
        Ok(merged)
    }

    fn name(&self) -> &'static str {
        "arxiv-split"
    }
}
