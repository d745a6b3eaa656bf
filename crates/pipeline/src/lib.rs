//! Concurrent recommendation pipeline.
//!
//! This crate provides the building blocks the orchestrator wires together:
//! - `Recommendation`, the record that flows between stages
//! - the similarity function (and an optional pairwise cache)
//! - the `Filter` trait, the seen and popularity filters, and
//!   `FilterPipeline` which runs each filter as its own task
//! - the candidate generator, the scorer pool and the collector
//!
//! ## Architecture
//! ```text
//! generator -> seen filter -> popularity filter -> scorer pool (N workers) -> collector
//! ```
//! Every arrow is a capacity-one channel, so a slow stage throttles the
//! stages before it. A shared `CancellationToken` is checked on every
//! send and receive, so any stage can be stopped while blocked.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::filters::*;
//! use pipeline::{FilterPipeline, Scorer, collect, spawn_generator, spawn_scorer_pool};
//!
//! let mut tasks = JoinSet::new();
//! let candidates = spawn_generator(&mut tasks, index.clone(), user_id, cancel.clone());
//! let filtered = FilterPipeline::new()
//!     .add_filter(AlreadySeenFilter::new(&index, user_id)?)
//!     .add_filter(PopularityFilter::new(index.clone(), 10))
//!     .spawn(&mut tasks, candidates, cancel.clone());
//! let scored = spawn_scorer_pool(&mut tasks, Scorer::new(index, user_id)?, 2, filtered, cancel.clone());
//! let top = collect(scored, 20, cancel).await;
//! ```

pub mod channel;
pub mod collector;
pub mod config;
pub mod filter_pipeline;
pub mod filters;
pub mod generator;
pub mod scorer;
pub mod similarity;
pub mod traits;
pub mod types;

// Re-export main types
pub use collector::{collect, select_top};
pub use config::PipelineConfig;
pub use filter_pipeline::FilterPipeline;
pub use generator::spawn_generator;
pub use scorer::{Scorer, spawn_scorer_pool};
pub use similarity::{SimilarityCache, similarity};
pub use traits::Filter;
pub use types::Recommendation;
