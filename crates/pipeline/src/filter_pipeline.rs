//! The FilterPipeline chains filters into concurrent stages.
//!
//! Each filter becomes its own task, reading from the previous stage's
//! channel and writing to a fresh one, so a slow filter throttles the ones
//! upstream of it.

use crate::channel::{StageReceiver, recv_or_cancel, send_or_cancel, stage_channel};
use crate::traits::Filter;
use crate::types::Recommendation;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let filters = FilterPipeline::new()
///     .add_filter(AlreadySeenFilter::new(&index, user_id)?)
///     .add_filter(PopularityFilter::new(index.clone(), 10));
///
/// let filtered_rx = filters.spawn(&mut tasks, candidates_rx, cancel.clone());
/// ```
#[derive(Clone, Default)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the end of the chain (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Filter names in the order they run
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run one candidate through every filter in order, synchronously.
    pub fn apply(&self, candidate: Recommendation) -> Option<Recommendation> {
        self.filters
            .iter()
            .try_fold(candidate, |candidate, filter| filter.apply(candidate))
    }

    /// Spawn one stage task per filter onto `tasks` and return the receiver
    /// at the end of the chain. With no filters, `input` is returned as is.
    pub fn spawn(
        &self,
        tasks: &mut JoinSet<()>,
        input: StageReceiver,
        cancel: CancellationToken,
    ) -> StageReceiver {
        self.filters.iter().fold(input, |upstream, filter| {
            spawn_filter_stage(tasks, Arc::clone(filter), upstream, cancel.clone())
        })
    }
}

fn spawn_filter_stage(
    tasks: &mut JoinSet<()>,
    filter: Arc<dyn Filter>,
    input: StageReceiver,
    cancel: CancellationToken,
) -> StageReceiver {
    let (output, rx) = stage_channel();

    tasks.spawn(async move {
        let (mut seen, mut passed) = (0usize, 0usize);

        while let Some(candidate) = recv_or_cancel(&input, &cancel).await {
            seen += 1;
            if let Some(candidate) = filter.apply(candidate) {
                if !send_or_cancel(&output, candidate, &cancel).await {
                    break;
                }
                passed += 1;
            }
        }

        debug!(
            "Filter stage finished: {} (input count: {}, output count: {}, cancelled: {})",
            filter.name(),
            seen,
            passed,
            cancel.is_cancelled()
        );
    });

    rx
}
