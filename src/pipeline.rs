// src/pipeline.rs
//! One collection run: fetch each category through its fallback chain,
//! score and filter, deduplicate, rank, cap. Category failures are isolated
//! and logged; the run always produces a (possibly empty) result.

use chrono::{DateTime, FixedOffset, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::collect::chain::FallbackChain;
use crate::collect::providers::arxiv::{ArxivApiSource, ArxivSplitSource};
use crate::collect::providers::rss::RssFeedSource;
use crate::collect::truncate_chars;
use crate::collect::types::{CandidateRecord, FetchWindow, RecordExtra, SourceCategory};
use crate::config::CollectorConfig;
use crate::relevance::RelevanceScorer;
use crate::translate::Translate;

/// One-time metrics registration (no exporter is wired; series stay no-ops
/// unless a recorder is installed by the embedding process).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_records_fetched_total",
            "Raw records parsed from sources."
        );
        describe_counter!(
            "digest_excluded_total",
            "Records vetoed by the exclusion list."
        );
        describe_counter!(
            "digest_below_threshold_total",
            "News records dropped below the minimum relevance score."
        );
        describe_counter!("digest_dedup_total", "Records removed by deduplication.");
        describe_counter!(
            "digest_adapter_failures_total",
            "Source adapter fetch failures (after retries)."
        );
        describe_counter!(
            "digest_chain_failures_total",
            "Categories where every adapter in the chain failed."
        );
        describe_histogram!("digest_parse_ms", "Source parse time in milliseconds.");
        describe_gauge!("digest_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Drop items whose identity key was already seen, keeping the first
/// occurrence. Runs before ranking so identity collisions from the
/// split-source merge resolve consistently. Generic over the key accessor
/// so scored `(record, score)` pairs dedup through the same policy.
pub fn dedupe_by_identity<T>(items: Vec<T>, key: impl Fn(&T) -> &str) -> (Vec<T>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|it| seen.insert(key(it).to_string()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Stable sort by score descending, then truncate. Ties keep fetch order.
pub fn rank_and_cap(
    mut scored: Vec<(CandidateRecord, f32)>,
    cap: usize,
) -> Vec<(CandidateRecord, f32)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(cap);
    scored
}

#[derive(Debug, Clone, Serialize)]
pub struct Paper {
    pub title: String,
    /// At most three names; `more_authors` marks a truncated list.
    pub authors: Vec<String>,
    pub more_authors: bool,
    pub summary: String,
    pub url: String,
    pub published: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStats {
    pub fetched: usize,
    pub window_dropped: usize,
    pub excluded: usize,
    pub below_threshold: usize,
    pub deduped: usize,
    pub selected: usize,
    pub source_failed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub papers: CategoryStats,
    pub news: CategoryStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub papers: Vec<Paper>,
    pub news: Vec<NewsItem>,
    pub stats: RunStats,
    pub generated_at: DateTime<FixedOffset>,
}

pub struct CollectionPipeline {
    lookback_days: i64,
    report_offset: FixedOffset,
    max_papers: usize,
    max_news: usize,
    news_min_score: f32,
    summary_cap: usize,
    scorer: RelevanceScorer,
    academic: FallbackChain,
    news: FallbackChain,
    translator: Option<Box<dyn Translate>>,
}

impl CollectionPipeline {
    /// Wire the production chains: arXiv composite query first, split-query
    /// fallback second; one aggregating RSS adapter for news.
    pub fn from_config(cfg: &CollectorConfig) -> Self {
        let retry = cfg.retry.policy();
        let academic = FallbackChain::new(
            SourceCategory::Academic,
            vec![
                Box::new(ArxivApiSource::new(&cfg.academic, &cfg.http, retry)),
                Box::new(ArxivSplitSource::new(&cfg.academic, &cfg.http, retry)),
            ],
        );
        let news = FallbackChain::new(
            SourceCategory::News,
            vec![Box::new(RssFeedSource::new(&cfg.news, &cfg.http, retry))],
        );
        Self::with_chains(cfg, academic, news)
    }

    /// Same wiring but with caller-supplied chains (tests use fixtures).
    pub fn with_chains(cfg: &CollectorConfig, academic: FallbackChain, news: FallbackChain) -> Self {
        Self {
            lookback_days: cfg.run.lookback_days,
            report_offset: cfg.run.report_offset(),
            max_papers: cfg.run.max_papers,
            max_news: cfg.run.max_news,
            news_min_score: cfg.news.min_score,
            summary_cap: cfg.relevance.summary_cap,
            scorer: RelevanceScorer::new(&cfg.relevance),
            academic,
            news,
            translator: None,
        }
    }

    pub fn with_translator(mut self, translator: Box<dyn Translate>) -> Self {
        self.translator = Some(translator);
        self
    }

    fn translate(&self, text: &str) -> String {
        match &self.translator {
            Some(t) => t.translate(text),
            None => text.to_string(),
        }
    }

    /// Run once, anchored at the current time in the report time zone.
    pub async fn run(&self) -> RunOutput {
        let now = Utc::now().with_timezone(&self.report_offset);
        self.run_at(now).await
    }

    /// Run once at an explicit "now" (deterministic for tests).
    pub async fn run_at(&self, now: DateTime<FixedOffset>) -> RunOutput {
        ensure_metrics_described();
        let window = FetchWindow::new(now, self.lookback_days);

        let mut stats = RunStats::default();

        let academic_raw = match self.academic.fetch(&window).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "pipeline", error = %e, "academic category unavailable, continuing");
                counter!("digest_chain_failures_total").increment(1);
                stats.papers.source_failed = true;
                Vec::new()
            }
        };
        let news_raw = match self.news.fetch(&window).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "pipeline", error = %e, "news category unavailable, continuing");
                counter!("digest_chain_failures_total").increment(1);
                stats.news.source_failed = true;
                Vec::new()
            }
        };

        let papers = self.process_academic(academic_raw, &window, &mut stats.papers);
        let news = self.process_news(news_raw, &mut stats.news);

        gauge!("digest_last_run_ts").set(now.timestamp() as f64);
        info!(
            target: "pipeline",
            papers = papers.len(),
            news = news.len(),
            "collection run finished"
        );

        RunOutput {
            papers,
            news,
            stats,
            generated_at: now,
        }
    }

    /// Truncate text fields ahead of scoring/translation.
    fn cap_record(&self, mut rec: CandidateRecord) -> CandidateRecord {
        rec.summary_text = truncate_chars(&rec.summary_text, self.summary_cap);
        rec
    }

    fn process_academic(
        &self,
        raw: Vec<CandidateRecord>,
        window: &FetchWindow,
        stats: &mut CategoryStats,
    ) -> Vec<Paper> {
        stats.fetched = raw.len();

        // Adapters pre-filter, but the pipeline's "now" is authoritative.
        let in_window: Vec<CandidateRecord> =
            raw.into_iter().filter(|r| window.admits(r)).collect();
        stats.window_dropped = stats.fetched - in_window.len();

        let mut scored = Vec::with_capacity(in_window.len());
        for rec in in_window {
            let rec = self.cap_record(rec);
            let rel = self.scorer.score(&rec.title, &rec.summary_text);
            if rel.excluded {
                stats.excluded += 1;
                counter!("digest_excluded_total").increment(1);
                continue;
            }
            // Academic records are not threshold-filtered; the source is
            // intrinsically on-topic and the date/category query already cut.
            scored.push((rec, rel.score));
        }

        let (scored, removed) = dedupe_by_identity(scored, |(r, _)| r.identity_key.as_str());
        stats.deduped = removed;
        counter!("digest_dedup_total").increment(stats.deduped as u64);

        let ranked = rank_and_cap(scored, self.max_papers);
        stats.selected = ranked.len();

        ranked
            .into_iter()
            .map(|(rec, _)| self.to_paper(rec))
            .collect()
    }

    fn process_news(&self, raw: Vec<CandidateRecord>, stats: &mut CategoryStats) -> Vec<NewsItem> {
        stats.fetched = raw.len();

        let mut scored = Vec::with_capacity(raw.len());
        for rec in raw {
            let rec = self.cap_record(rec);
            let rel = self.scorer.score(&rec.title, &rec.summary_text);
            if rel.excluded {
                stats.excluded += 1;
                counter!("digest_excluded_total").increment(1);
                continue;
            }
            if rel.score < self.news_min_score {
                stats.below_threshold += 1;
                counter!("digest_below_threshold_total").increment(1);
                continue;
            }
            scored.push((rec, rel.score));
        }

        let (scored, removed) = dedupe_by_identity(scored, |(r, _)| r.identity_key.as_str());
        stats.deduped = removed;
        counter!("digest_dedup_total").increment(stats.deduped as u64);

        let ranked = rank_and_cap(scored, self.max_news);
        stats.selected = ranked.len();

        ranked
            .into_iter()
            .map(|(rec, score)| self.to_news_item(rec, score))
            .collect()
    }

    fn to_paper(&self, rec: CandidateRecord) -> Paper {
        let (authors, categories) = match rec.extra {
            RecordExtra::Paper {
                authors,
                categories,
            } => (authors, categories),
            RecordExtra::News { .. } => (Vec::new(), Vec::new()),
        };
        let more_authors = authors.len() > 3;
        Paper {
            title: self.translate(&rec.title),
            authors: authors.into_iter().take(3).collect(),
            more_authors,
            summary: self.translate(&rec.summary_text),
            url: rec.identity_key,
            published: rec
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "date unknown".to_string()),
            categories,
        }
    }

    fn to_news_item(&self, rec: CandidateRecord, score: f32) -> NewsItem {
        let published = match rec.published_at {
            Some(d) => d.format("%Y-%m-%d %H:%M %:z").to_string(),
            None => rec
                .published_text
                .clone()
                .unwrap_or_else(|| "date unknown".to_string()),
        };
        NewsItem {
            title: self.translate(&rec.title),
            link: rec.identity_key,
            published,
            summary: self.translate(&rec.summary_text),
            relevance_score: score,
        }
    }
}
