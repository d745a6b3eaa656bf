//! Errors surfaced by the orchestrator.

use data_loader::UserId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    /// The target user has no ratings in the store; no pipeline work is done
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// A stage task panicked or was torn down by the runtime
    #[error("Pipeline task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
