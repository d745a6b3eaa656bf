//! Scoring stage: a fixed-size pool of workers sharing one input and one
//! output channel.
//!
//! Each worker pulls a candidate, computes the mean similarity between the
//! target user and the movie's co-likers on the blocking thread pool, and
//! pushes the scored candidate downstream. Workers race, so output order
//! is unrelated to input order.

use crate::channel::{StageReceiver, recv_or_cancel, send_or_cancel, stage_channel};
use crate::similarity::{SimilarityCache, similarity};
use crate::types::Recommendation;
use data_loader::{DataIndex, User, UserId};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Computes a candidate's score for one target user
#[derive(Clone)]
pub struct Scorer {
    data_index: Arc<DataIndex>,
    target: Arc<User>,
    cache: Option<Arc<SimilarityCache>>,
}

impl Scorer {
    /// `None` if `user_id` is not in the rating store
    pub fn new(data_index: Arc<DataIndex>, user_id: UserId) -> Option<Self> {
        let target = Arc::new(data_index.get_user(user_id)?.clone());
        Some(Self {
            data_index,
            target,
            cache: None,
        })
    }

    /// Share a similarity cache with other scorers
    pub fn with_cache(mut self, cache: Arc<SimilarityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Mean similarity between the target and every other liker of the
    /// movie. The target itself never counts toward the mean; with no other
    /// likers the score stays at 0.
    pub fn score(&self, mut candidate: Recommendation) -> Recommendation {
        let target = self.target.as_ref();
        let (sum, count) = self
            .data_index
            .popularity()
            .likers(candidate.movie_id)
            .iter()
            .filter(|&&liker| liker != target.id)
            .filter_map(|&liker| self.data_index.get_user(liker))
            .fold((0.0, 0usize), |(sum, count), other| {
                (sum + self.similarity(target, other), count + 1)
            });

        if count > 0 {
            candidate.score = sum / count as f64;
        }
        candidate
    }

    fn similarity(&self, target: &User, other: &User) -> f64 {
        match &self.cache {
            Some(cache) => cache.get_or_compute(target, other),
            None => similarity(target, other),
        }
    }
}

/// Spawn `workers` scorer tasks reading from `input`.
///
/// The returned receiver closes once every worker has finished, because
/// each worker owns one clone of the output sender.
pub fn spawn_scorer_pool(
    tasks: &mut JoinSet<()>,
    scorer: Scorer,
    workers: usize,
    input: StageReceiver,
    cancel: CancellationToken,
) -> StageReceiver {
    let (output, rx) = stage_channel();

    for worker_id in 0..workers.max(1) {
        let scorer = scorer.clone();
        let input = input.clone();
        let output = output.clone();
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let mut scored = 0usize;

            while let Some(candidate) = recv_or_cancel(&input, &cancel).await {
                let job = scorer.clone();
                let candidate = match tokio::task::spawn_blocking(move || job.score(candidate)).await {
                    Ok(candidate) => candidate,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        warn!(worker_id, "Scoring job did not complete: {}", e);
                        break;
                    }
                };

                if !send_or_cancel(&output, candidate, &cancel).await {
                    break;
                }
                scored += 1;
            }

            debug!(worker_id, scored, cancelled = cancel.is_cancelled(), "Scorer worker finished");
        });
    }

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Movie, MovieId, Rating};

    fn rating(user_id: UserId, movie_id: MovieId, rating: f32) -> Rating {
        Rating { user_id, movie_id, rating, timestamp: 0 }
    }

    fn candidate(movie_id: MovieId) -> Recommendation {
        Recommendation {
            user_id: 1,
            movie_id,
            movie_title: format!("Movie {}", movie_id),
            score: 0.0,
            n_users: 0,
        }
    }

    fn create_test_index() -> Arc<DataIndex> {
        let movies = (1..=4)
            .map(|id| Movie { id, title: format!("Movie {}", id), genres: vec![] })
            .collect();
        let ratings = vec![
            // target: likes 1, dislikes 2
            rating(1, 1, 5.0),
            rating(1, 2, 1.0),
            // user 2 agrees on both and likes 3
            rating(2, 1, 4.0),
            rating(2, 2, 2.0),
            rating(2, 3, 4.0),
            // user 3 disagrees on 1, likes 3
            rating(3, 1, 1.0),
            rating(3, 3, 5.0),
        ];
        Arc::new(DataIndex::from_parts(movies, ratings, 3.5))
    }

    #[test]
    fn test_score_is_mean_similarity() {
        let index = create_test_index();
        let scorer = Scorer::new(index.clone(), 1).unwrap();

        let scored = scorer.score(candidate(3));

        // user 2: agrees on {1,2} over {1,2,3} = 2/3
        // user 3: agrees on nothing over {1,2,3} = 0
        assert!((scored.score - (2.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_co_likers_scores_zero() {
        let index = create_test_index();
        let scorer = Scorer::new(index, 1).unwrap();

        assert_eq!(scorer.score(candidate(4)).score, 0.0);
    }

    #[test]
    fn test_target_excluded_from_mean() {
        let index = create_test_index();
        let scorer = Scorer::new(index.clone(), 1).unwrap();

        // likers of 1 are users 1 and 2; only user 2 counts
        let expected = similarity(index.get_user(1).unwrap(), index.get_user(2).unwrap());
        assert_eq!(scorer.score(candidate(1)).score, expected);
    }

    #[test]
    fn test_unknown_target_has_no_scorer() {
        assert!(Scorer::new(create_test_index(), 99).is_none());
    }

    #[test]
    fn test_cache_gives_same_scores() {
        let index = create_test_index();
        let cache = Arc::new(SimilarityCache::new());
        let plain = Scorer::new(index.clone(), 1).unwrap();
        let cached = Scorer::new(index, 1).unwrap().with_cache(cache.clone());

        for movie_id in 1..=4 {
            assert_eq!(plain.score(candidate(movie_id)).score, cached.score(candidate(movie_id)).score);
        }
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_scores_everything() {
        let index = create_test_index();
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        let (tx, rx) = stage_channel();
        let out = spawn_scorer_pool(&mut tasks, Scorer::new(index, 1).unwrap(), 3, rx, cancel.clone());

        tasks.spawn(async move {
            for movie_id in 1..=4 {
                let _ = tx.send(candidate(movie_id)).await;
            }
        });

        let mut ids = Vec::new();
        while let Ok(rec) = out.recv().await {
            ids.push(rec.movie_id);
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
