//! Filter to remove movies the target user has already rated.
//!
//! This is the first filter in the chain: there's no point in recommending
//! a movie the user has an opinion on, liked or not.

use crate::traits::Filter;
use crate::types::Recommendation;
use data_loader::{DataIndex, User, UserId};
use std::sync::Arc;

/// Removes candidates present in the user's liked or not-liked set.
///
/// ## Algorithm
/// Two `HashSet` lookups per candidate, O(1) regardless of how much the
/// user has rated.
pub struct AlreadySeenFilter {
    target: Arc<User>,
}

impl AlreadySeenFilter {
    /// Resolve the target user up front; `None` if `user_id` is not in the
    /// rating store.
    pub fn new(data_index: &DataIndex, user_id: UserId) -> Option<Self> {
        let target = data_index.get_user(user_id)?;
        Some(Self {
            target: Arc::new(target.clone()),
        })
    }
}

impl Filter for AlreadySeenFilter {
    fn name(&self) -> &str {
        "AlreadySeenFilter"
    }

    fn apply(&self, candidate: Recommendation) -> Option<Recommendation> {
        (!self.target.has_rated(candidate.movie_id)).then_some(candidate)
    }
}
