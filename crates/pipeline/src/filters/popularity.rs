//! Filter to enforce the popularity floor.
//!
//! A movie is only worth scoring if at least K users liked it; the like
//! count that let it through is frozen onto the candidate as `n_users`.

use crate::traits::Filter;
use crate::types::Recommendation;
use data_loader::DataIndex;
use std::sync::Arc;

/// Removes candidates liked by fewer than `min_likers` users.
pub struct PopularityFilter {
    data_index: Arc<DataIndex>,
    min_likers: usize,
}

impl PopularityFilter {
    /// Create a new PopularityFilter.
    ///
    /// # Arguments
    /// * `data_index` - Shared reference to DataIndex for like counts
    /// * `min_likers` - Minimum number of likers (typically 10)
    pub fn new(data_index: Arc<DataIndex>, min_likers: usize) -> Self {
        Self {
            data_index,
            min_likers,
        }
    }
}

impl Filter for PopularityFilter {
    fn name(&self) -> &str {
        "PopularityFilter"
    }

    fn apply(&self, mut candidate: Recommendation) -> Option<Recommendation> {
        let like_count = self.data_index.popularity().like_count(candidate.movie_id);
        if like_count < self.min_likers {
            return None;
        }
        candidate.n_users = like_count;
        Some(candidate)
    }
}
