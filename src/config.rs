// src/config.rs
//! One TOML file drives a run: lookback window, per-category caps, keyword
//! tiers, exclusion list, retry parameters, source endpoints. Built once per
//! run, immutable thereafter. Credentials never live here; delivery reads
//! them from the process environment.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::relevance::RelevanceConfig;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";
pub const ENV_CONFIG_PATH: &str = "COLLECTOR_CONFIG_PATH";
pub const ENV_NEWS_MIN_SCORE: &str = "NEWS_MIN_SCORE";

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub http: HttpSection,
    pub academic: AcademicSection,
    pub news: NewsSection,
    #[serde(default)]
    pub relevance: RelevanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Fixed UTC offset of the reporting time zone, hours east.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,
    #[serde(default = "default_max_news")]
    pub max_news: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            utc_offset_hours: default_utc_offset_hours(),
            max_papers: default_max_papers(),
            max_news: default_max_news(),
            output_dir: default_output_dir(),
        }
    }
}

impl RunSection {
    pub fn report_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl HttpSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcademicSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// arXiv category codes, e.g. "math.OC".
    pub categories: Vec<String>,
    /// Title keyword/phrase clauses for the composite query.
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsSection {
    pub feeds: Vec<String>,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Entries inspected per feed before moving on.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
}

fn default_lookback_days() -> i64 {
    1
}
fn default_utc_offset_hours() -> i32 {
    9
}
fn default_max_papers() -> usize {
    20
}
fn default_max_news() -> usize {
    5
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_api_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}
fn default_max_results() -> usize {
    50
}
fn default_min_score() -> f32 {
    2.0
}
fn default_scan_limit() -> usize {
    10
}

// parse optional float env and clamp to non-negative
fn parse_min_score_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
}

impl CollectorConfig {
    /// Load using $COLLECTOR_CONFIG_PATH, falling back to
    /// `config/collector.toml`.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading collector config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut cfg: CollectorConfig =
            toml::from_str(toml_str).context("parsing collector config")?;

        if let Some(v) = parse_min_score_env(std::env::var(ENV_NEWS_MIN_SCORE).ok()) {
            cfg.news.min_score = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.lookback_days < 1 {
            anyhow::bail!("run.lookback_days must be >= 1");
        }
        if self.run.utc_offset_hours.abs() > 14 {
            anyhow::bail!("run.utc_offset_hours must be within ±14");
        }
        if self.academic.categories.is_empty() {
            anyhow::bail!("academic.categories must not be empty");
        }
        if self.news.feeds.is_empty() {
            anyhow::bail!("news.feeds must not be empty");
        }
        self.relevance.validate()?;
        Ok(())
    }
}
