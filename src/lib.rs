// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod collect;
pub mod config;
pub mod pipeline;
pub mod relevance;
pub mod report;
pub mod retry;
pub mod translate;

// Report delivery (email, Discord webhook, file persistence)
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::collect::chain::FallbackChain;
pub use crate::collect::types::{CandidateRecord, FetchWindow, SourceAdapter, SourceCategory};
pub use crate::pipeline::{CollectionPipeline, RunOutput};
pub use crate::relevance::{Relevance, RelevanceScorer};
pub use crate::retry::{FetchError, RetryPolicy};
