//! Tunables for a pipeline run.

use serde::Serialize;
use std::time::Duration;

/// Immutable settings handed to the orchestrator at construction.
///
/// Built with `Default` plus the `with_*` methods; nothing in the pipeline
/// reads process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Minimum number of users who must have liked a movie (K)
    pub min_likers: usize,
    /// Maximum number of recommendations returned (N)
    pub top_n: usize,
    /// Size of the scorer worker pool
    pub scorer_workers: usize,
    /// Cancel the run if it takes longer than this
    pub timeout: Option<Duration>,
    /// Reuse pairwise similarities across runs of the same orchestrator
    pub cache_similarity: bool,
}

impl PipelineConfig {
    /// Configure the popularity floor K (default: 10)
    pub fn with_min_likers(mut self, min_likers: usize) -> Self {
        self.min_likers = min_likers;
        self
    }

    /// Configure the result cap N (default: 20)
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Configure the scorer pool size (default: 2)
    pub fn with_scorer_workers(mut self, workers: usize) -> Self {
        self.scorer_workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_similarity(mut self, enabled: bool) -> Self {
        self.cache_similarity = enabled;
        self
    }

    /// Pool size actually used; a pool of zero workers would never drain.
    pub fn workers(&self) -> usize {
        self.scorer_workers.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_likers: 10,
            top_n: 20,
            scorer_workers: 2,
            timeout: None,
            cache_similarity: false,
        }
    }
}
