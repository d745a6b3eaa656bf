//! First stage: one unscored candidate per catalog entry.

use crate::channel::{StageReceiver, send_or_cancel, stage_channel};
use crate::types::Recommendation;
use data_loader::{DataIndex, UserId};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawn the candidate generator and return the receiving end of its output.
///
/// Catalog order is whatever the underlying map yields. The task stops as
/// soon as the run is cancelled or nobody is listening any more; dropping
/// its sender is what tells the next stage the stream is over.
pub fn spawn_generator(
    tasks: &mut JoinSet<()>,
    data_index: Arc<DataIndex>,
    user_id: UserId,
    cancel: CancellationToken,
) -> StageReceiver {
    let (output, rx) = stage_channel();

    tasks.spawn(async move {
        let mut emitted = 0usize;
        for movie in data_index.movies() {
            if !send_or_cancel(&output, Recommendation::candidate(user_id, movie), &cancel).await {
                debug!("Generator stopped early after {} candidates", emitted);
                return;
            }
            emitted += 1;
        }
        debug!("Generator finished: {} candidates", emitted);
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn catalog(n: u32) -> Arc<DataIndex> {
        let movies = (1..=n)
            .map(|id| Movie { id, title: format!("Movie {}", id), genres: vec![] })
            .collect();
        Arc::new(DataIndex::from_parts(movies, vec![], 3.5))
    }

    #[tokio::test]
    async fn test_emits_every_movie_once() {
        let mut tasks = JoinSet::new();
        let rx = spawn_generator(&mut tasks, catalog(25), 7, CancellationToken::new());

        let mut ids = Vec::new();
        while let Ok(rec) = rx.recv().await {
            assert_eq!(rec.user_id, 7);
            assert_eq!(rec.score, 0.0);
            assert_eq!(rec.n_users, 0);
            ids.push(rec.movie_id);
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=25).collect::<Vec<_>>());
        assert!(tasks.join_next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let mut tasks = JoinSet::new();
        let cancel = CancellationToken::new();
        let rx = spawn_generator(&mut tasks, catalog(1000), 1, cancel.clone());

        // take one and walk away
        assert!(rx.recv().await.is_ok());
        cancel.cancel();

        let joined = tokio::time::timeout(std::time::Duration::from_secs(1), tasks.join_next()).await;
        assert!(joined.expect("generator did not stop").unwrap().is_ok());
    }
}
