//! Channels between stages and the cancellation-aware send/receive used by
//! every stage loop.
//!
//! Each edge of the chain is a bounded channel of capacity one, so a stage
//! can run at most one record ahead of its consumer. The channels are
//! multi-producer multi-consumer, which lets the scorer pool share a single
//! input and a single output.

use crate::types::Recommendation;
use tokio_util::sync::CancellationToken;

pub type StageSender = async_channel::Sender<Recommendation>;
pub type StageReceiver = async_channel::Receiver<Recommendation>;

/// Capacity of every inter-stage channel
pub const STAGE_CAPACITY: usize = 1;

pub fn stage_channel() -> (StageSender, StageReceiver) {
    async_channel::bounded(STAGE_CAPACITY)
}

/// Next record from upstream, or `None` once upstream is finished or the
/// run is cancelled. Cancellation wins if both are ready.
pub async fn recv_or_cancel(
    input: &StageReceiver,
    cancel: &CancellationToken,
) -> Option<Recommendation> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        msg = input.recv() => msg.ok(),
    }
}

/// Hand a record downstream. Returns `false` if the run was cancelled or
/// every consumer is gone; the caller should stop in both cases.
pub async fn send_or_cancel(
    output: &StageSender,
    rec: Recommendation,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        res = output.send(rec) => res.is_ok(),
    }
}
