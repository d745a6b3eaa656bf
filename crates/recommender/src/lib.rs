//! Recommendation orchestrator.
//!
//! This crate wires the pipeline stages together for one target user, owns
//! the cancellation signal for the run, and waits for every stage to shut
//! down before reporting back.

pub mod error;
pub mod orchestrator;

pub use error::RecommendError;
pub use orchestrator::{PipelineOutcome, RecommendationOrchestrator, RunReport};
