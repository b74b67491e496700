// src/relevance.rs
//! Tiered keyword relevance: exclusion veto first, then weighted
//! distinct-keyword hits summed across tiers. Pure and deterministic —
//! same text + same table + same exclusions always yields the same result.

use serde::Deserialize;

pub const DEFAULT_EXCLUSION_THRESHOLD: usize = 2;
pub const DEFAULT_SUMMARY_CAP: usize = 500;

/// One tier: a keyword set and the weight each distinct hit contributes.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTier {
    pub name: String,
    pub weight: f32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    #[serde(default = "default_exclusion_threshold")]
    pub exclusion_threshold: usize,
    #[serde(default = "default_summary_cap")]
    pub summary_cap: usize,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub tiers: Vec<KeywordTier>,
}

fn default_exclusion_threshold() -> usize {
    DEFAULT_EXCLUSION_THRESHOLD
}

fn default_summary_cap() -> usize {
    DEFAULT_SUMMARY_CAP
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            exclusion_threshold: DEFAULT_EXCLUSION_THRESHOLD,
            summary_cap: DEFAULT_SUMMARY_CAP,
            exclusions: Vec::new(),
            tiers: Vec::new(),
        }
    }
}

impl RelevanceConfig {
    /// Tiers must be listed heaviest-first with strictly decreasing weights,
    /// and every weight must be positive and finite.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut prev: Option<f32> = None;
        for tier in &self.tiers {
            if !tier.weight.is_finite() || tier.weight <= 0.0 {
                anyhow::bail!("tier `{}` has non-positive weight {}", tier.name, tier.weight);
            }
            if let Some(p) = prev {
                if tier.weight >= p {
                    anyhow::bail!(
                        "tier `{}` weight {} must be strictly below the previous tier's {}",
                        tier.name,
                        tier.weight,
                        p
                    );
                }
            }
            prev = Some(tier.weight);
        }
        Ok(())
    }
}

/// Result of scoring one record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Relevance {
    pub score: f32,
    pub excluded: bool,
    /// Distinct keywords that hit, for logging and diagnostics.
    pub matched: Vec<String>,
}

#[derive(Debug, Clone)]
struct CompiledTier {
    weight: f32,
    keywords: Vec<String>, // lowercased
}

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    tiers: Vec<CompiledTier>,
    exclusions: Vec<String>, // lowercased
    exclusion_threshold: usize,
}

impl RelevanceScorer {
    pub fn new(cfg: &RelevanceConfig) -> Self {
        Self {
            tiers: cfg
                .tiers
                .iter()
                .map(|t| CompiledTier {
                    weight: t.weight,
                    keywords: t.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
                .collect(),
            exclusions: cfg.exclusions.iter().map(|k| k.to_lowercase()).collect(),
            exclusion_threshold: cfg.exclusion_threshold,
        }
    }

    /// Score `title + " " + summary`, lowercased. A hit is a keyword
    /// occurring as a substring; each distinct keyword counts once.
    pub fn score(&self, title: &str, summary: &str) -> Relevance {
        let text = format!("{} {}", title, summary).to_lowercase();

        let excluded_hits: Vec<&String> = self
            .exclusions
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .collect();
        if self.exclusion_threshold > 0 && excluded_hits.len() >= self.exclusion_threshold {
            return Relevance {
                score: 0.0,
                excluded: true,
                matched: excluded_hits.into_iter().cloned().collect(),
            };
        }

        let mut score = 0.0f32;
        let mut matched = Vec::new();
        for tier in &self.tiers {
            let mut hits = 0usize;
            for kw in &tier.keywords {
                if text.contains(kw.as_str()) {
                    hits += 1;
                    matched.push(kw.clone());
                }
            }
            score += hits as f32 * tier.weight;
        }
        Relevance {
            score,
            excluded: false,
            matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(&RelevanceConfig {
            exclusion_threshold: 2,
            summary_cap: 500,
            exclusions: vec!["sports".into(), "weather".into()],
            tiers: vec![
                KeywordTier {
                    name: "high".into(),
                    weight: 4.0,
                    keywords: vec!["optimization".into(), "linear programming".into()],
                },
                KeywordTier {
                    name: "medium".into(),
                    weight: 2.0,
                    keywords: vec!["model".into(), "algorithm".into()],
                },
            ],
        })
    }

    #[test]
    fn tier_weights_sum_over_distinct_hits() {
        let r = scorer().score("Optimization model for scheduling", "");
        assert!(!r.excluded);
        assert!((r.score - 6.0).abs() < f32::EPSILON, "got {}", r.score);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let r = scorer().score("algorithm algorithm algorithm", "");
        assert!((r.score - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn exclusion_vetoes_regardless_of_tier_matches() {
        let text = "sports weather algorithm algorithm algorithm";
        let r = scorer().score(text, "");
        assert!(r.excluded);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn single_exclusion_hit_is_below_default_threshold() {
        let r = scorer().score("sports optimization coverage", "");
        assert!(!r.excluded);
        assert!((r.score - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let a = s.score("convex optimization model", "with a greedy algorithm");
        let b = s.score("convex optimization model", "with a greedy algorithm");
        assert_eq!(a, b);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let r = scorer().score("LINEAR PROGRAMMING survey", "");
        assert!((r.score - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tier_weights_must_strictly_decrease() {
        let cfg = RelevanceConfig {
            tiers: vec![
                KeywordTier {
                    name: "a".into(),
                    weight: 2.0,
                    keywords: vec![],
                },
                KeywordTier {
                    name: "b".into(),
                    weight: 2.0,
                    keywords: vec![],
                },
            ],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
