// tests/config_load.rs
use std::env;
use std::fs;

use optimization_digest::config::{CollectorConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};

const SAMPLE: &str = r#"
[run]
lookback_days = 3
max_news = 8

[academic]
categories = ["math.OC", "cs.DM"]
title_keywords = ["convex optimization"]

[news]
feeds = ["https://example.test/a.rss", "https://example.test/b.rss"]
min_score = 1.0

[[relevance.tiers]]
name = "core"
weight = 4.0
keywords = ["optimization"]

[[relevance.tiers]]
name = "adjacent"
weight = 1.0
keywords = ["machine learning"]
"#;

#[serial_test::serial]
#[test]
fn loads_from_an_explicit_path() {
    env::remove_var("NEWS_MIN_SCORE");
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("collector.toml");
    fs::write(&path, SAMPLE).unwrap();

    let cfg = CollectorConfig::from_path(&path).unwrap();
    assert_eq!(cfg.run.lookback_days, 3);
    assert_eq!(cfg.run.max_news, 8);
    assert_eq!(cfg.academic.categories.len(), 2);
    assert!((cfg.news.min_score - 1.0).abs() < f32::EPSILON);
    assert_eq!(cfg.relevance.tiers.len(), 2);
}

#[serial_test::serial]
#[test]
fn env_path_takes_precedence_over_the_default() {
    env::remove_var("NEWS_MIN_SCORE");
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("alt.toml");
    fs::write(&path, SAMPLE).unwrap();

    env::set_var(ENV_CONFIG_PATH, path.display().to_string());
    let cfg = CollectorConfig::load_default().unwrap();
    assert_eq!(cfg.run.lookback_days, 3);
    env::remove_var(ENV_CONFIG_PATH);
}

#[test]
fn the_shipped_default_config_parses() {
    // Guards against drift between the repo config and the schema.
    let content = fs::read_to_string(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH),
    )
    .unwrap();
    let cfg = CollectorConfig::from_toml_str(&content).unwrap();
    assert!(cfg.relevance.tiers.len() >= 2);
    assert!(!cfg.news.feeds.is_empty());
}
