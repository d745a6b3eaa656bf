//! # Recommendation Orchestrator
//!
//! This module coordinates one pipeline run:
//! 1. Check that the target user exists
//! 2. Spawn the generator, one task per filter, and the scorer pool
//! 3. Spawn the collector on the far end
//! 4. Wait for every stage to finish (or to notice cancellation)
//! 5. Cancel the token as a no-op confirmation and report
//!
//! All stages share one `CancellationToken`, a child of the caller's.
//! Cancelling it, whether from the caller, from the timeout watchdog, or
//! because a stage panicked, makes every stage leave its loop even if it is
//! blocked on a send. Only the caller's own abort travels downward; the
//! run's token never cancels the caller's.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use data_loader::{DataIndex, UserId};
use pipeline::filters::{AlreadySeenFilter, PopularityFilter};
use pipeline::{
    FilterPipeline, PipelineConfig, Recommendation, Scorer, SimilarityCache, collect,
    spawn_generator, spawn_scorer_pool,
};

use crate::error::RecommendError;

/// How a run ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Every candidate was processed; at most N records, best first
    Completed(Vec<Recommendation>),
    /// The run was stopped before the collector saw the end of the stream
    Cancelled,
}

impl PipelineOutcome {
    /// Recommendations of a completed run, empty if cancelled
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            PipelineOutcome::Completed(recs) => recs,
            PipelineOutcome::Cancelled => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineOutcome::Cancelled)
    }
}

/// Result of one run plus how long it took
#[derive(Debug, Clone)]
pub struct RunReport {
    pub user_id: UserId,
    pub outcome: PipelineOutcome,
    pub elapsed: Duration,
}

/// Main orchestrator that coordinates the recommendation pipeline
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    data_index: Arc<DataIndex>,
    config: PipelineConfig,
    cache: Option<Arc<SimilarityCache>>,
}

impl RecommendationOrchestrator {
    /// Create a new orchestrator over a loaded, read-only data index
    pub fn new(data_index: Arc<DataIndex>, config: PipelineConfig) -> Self {
        let cache = config
            .cache_similarity
            .then(|| Arc::new(SimilarityCache::new()));
        Self {
            data_index,
            config,
            cache,
        }
    }

    /// Run the pipeline for `user_id` to completion (or until the configured
    /// timeout fires).
    pub async fn get_recommendations(&self, user_id: UserId) -> Result<RunReport, RecommendError> {
        self.get_recommendations_with_cancel(user_id, CancellationToken::new())
            .await
    }

    /// Run the pipeline with a caller-owned cancellation token.
    ///
    /// Cancelling `cancel` aborts the run; this still waits for every stage
    /// to exit before returning `PipelineOutcome::Cancelled`. The run works on
    /// a child of `cancel`, so finishing or timing out never cancels the
    /// caller's token.
    #[instrument(skip(self, cancel), fields(workers = self.config.workers(), min_likers = self.config.min_likers))]
    pub async fn get_recommendations_with_cancel(
        &self,
        user_id: UserId,
        cancel: CancellationToken,
    ) -> Result<RunReport, RecommendError> {
        let (Some(filters), Some(scorer)) = (self.build_filters(user_id), self.build_scorer(user_id))
        else {
            return Err(RecommendError::UserNotFound(user_id));
        };

        let cancel = cancel.child_token();
        let start_time = Instant::now();
        let watchdog = self.config.timeout.map(|t| spawn_watchdog(t, cancel.clone()));

        let mut tasks = JoinSet::new();
        let candidates = spawn_generator(&mut tasks, self.data_index.clone(), user_id, cancel.clone());
        let filtered = filters.spawn(&mut tasks, candidates, cancel.clone());
        let scored = spawn_scorer_pool(
            &mut tasks,
            scorer,
            self.config.workers(),
            filtered,
            cancel.clone(),
        );
        let collector = tokio::spawn(collect(scored, self.config.top_n, cancel.clone()));

        debug!("Spawned {} stage tasks", tasks.len() + 1);

        // Wait for full shutdown. A failed stage takes the rest down with it.
        let mut failure = None;
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!("Pipeline stage failed: {}", e);
                cancel.cancel();
                failure.get_or_insert(e);
            }
        }
        let collected = collector.await;

        // Normal completion: confirm, which also releases the watchdog
        cancel.cancel();
        if let Some(watchdog) = watchdog {
            watchdog.await?;
        }

        if let Some(e) = failure {
            return Err(e.into());
        }

        let outcome = match collected? {
            Some(recs) => PipelineOutcome::Completed(recs),
            None => PipelineOutcome::Cancelled,
        };
        let elapsed = start_time.elapsed();

        info!(
            "Pipeline for user {} finished in {:.2?}: {}",
            user_id,
            elapsed,
            match &outcome {
                PipelineOutcome::Completed(recs) => format!("{} recommendations", recs.len()),
                PipelineOutcome::Cancelled => "cancelled".to_string(),
            }
        );

        Ok(RunReport {
            user_id,
            outcome,
            elapsed,
        })
    }

    /// Seen-filter first, then the popularity floor. `None` for an unknown user.
    fn build_filters(&self, user_id: UserId) -> Option<FilterPipeline> {
        let seen = AlreadySeenFilter::new(&self.data_index, user_id)?;
        Some(
            FilterPipeline::new()
                .add_filter(seen)
                .add_filter(PopularityFilter::new(
                    self.data_index.clone(),
                    self.config.min_likers,
                )),
        )
    }

    fn build_scorer(&self, user_id: UserId) -> Option<Scorer> {
        let scorer = Scorer::new(self.data_index.clone(), user_id)?;
        Some(match &self.cache {
            Some(cache) => scorer.with_cache(Arc::clone(cache)),
            None => scorer,
        })
    }
}

/// Cancel `cancel` once `timeout` elapses, unless it is cancelled first
fn spawn_watchdog(timeout: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                warn!("Pipeline timed out after {:?}, cancelling", timeout);
                cancel.cancel();
            }
        }
    })
}
