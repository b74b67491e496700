// src/collect/chain.rs
//! Ordered adapters for one source category, tried until one succeeds.
//! A successful-but-empty fetch short-circuits the chain; only adapter
//! failure falls through to the next one.

use tracing::{info, warn};

use crate::collect::types::{CandidateRecord, FetchWindow, SourceAdapter, SourceCategory};

#[derive(Debug, thiserror::Error)]
#[error("all {} sources unavailable", category.as_str())]
pub struct AllSourcesUnavailable {
    pub category: SourceCategory,
}

pub struct FallbackChain {
    category: SourceCategory,
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl FallbackChain {
    pub fn new(category: SourceCategory, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { category, adapters }
    }

    pub fn category(&self) -> SourceCategory {
        self.category
    }

    pub async fn fetch(
        &self,
        window: &FetchWindow,
    ) -> Result<Vec<CandidateRecord>, AllSourcesUnavailable> {
        for adapter in &self.adapters {
            match adapter.fetch(window).await {
                Ok(records) => {
                    info!(
                        target: "collect",
                        category = self.category.as_str(),
                        source = adapter.name(),
                        records = records.len(),
                        "source fetch succeeded"
                    );
                    return Ok(records);
                }
                Err(e) => {
                    warn!(
                        target: "collect",
                        category = self.category.as_str(),
                        source = adapter.name(),
                        error = %e,
                        "source failed, trying next in chain"
                    );
                    metrics::counter!("digest_adapter_failures_total").increment(1);
                }
            }
        }
        Err(AllSourcesUnavailable {
            category: self.category,
        })
    }
}
