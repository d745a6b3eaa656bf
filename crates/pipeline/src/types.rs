//! The record that flows through the pipeline.

use data_loader::{Movie, MovieId, UserId};
use serde::Serialize;

/// A candidate movie for the target user.
///
/// Owned by exactly one stage at a time: the popularity filter fills in
/// `n_users`, the scorer fills in `score`, nobody else writes to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub movie_title: String,
    /// Mean similarity to the movie's co-likers, in [0, 1]
    pub score: f64,
    /// Like count seen by the popularity filter
    pub n_users: usize,
}

impl Recommendation {
    /// Fresh, unscored candidate for `user_id`
    pub fn candidate(user_id: UserId, movie: &Movie) -> Self {
        Self {
            user_id,
            movie_id: movie.id,
            movie_title: movie.title.clone(),
            score: 0.0,
            n_users: 0,
        }
    }

    /// Score spread over the number of likers, 0 when nobody liked it
    pub fn prob_like(&self) -> f64 {
        if self.n_users == 0 {
            0.0
        } else {
            self.score / self.n_users as f64
        }
    }
}
