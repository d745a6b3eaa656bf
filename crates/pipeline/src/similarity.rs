//! Agreement between two users.
//!
//! The score is the fraction of the pair's combined rated movies on which
//! they agree: both liked it, or both did not.
//!
//! ```text
//! (|L1 ∩ L2| + |D1 ∩ D2|) / |L1 ∪ D1 ∪ L2 ∪ D2|
//! ```
//!
//! All membership tests go through the users' `HashSet`s, so one call costs
//! O(size of the smaller user's ratings).

use data_loader::{MovieId, User, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Jaccard-style agreement in [0, 1]; 0 when neither user rated anything.
pub fn similarity(u1: &User, u2: &User) -> f64 {
    let agree = intersection_len(&u1.liked, &u2.liked)
        + intersection_len(&u1.not_liked, &u2.not_liked);

    // liked and not_liked are disjoint per user, so the union is
    // |R1| + |R2| - |R1 ∩ R2| with R = liked ∪ not_liked
    let (small, large) = if u1.rated_count() <= u2.rated_count() {
        (u1, u2)
    } else {
        (u2, u1)
    };
    let overlap = small
        .liked
        .iter()
        .chain(small.not_liked.iter())
        .filter(|&&m| large.has_rated(m))
        .count();
    let universe = u1.rated_count() + u2.rated_count() - overlap;

    if universe == 0 {
        0.0
    } else {
        agree as f64 / universe as f64
    }
}

fn intersection_len(a: &HashSet<MovieId>, b: &HashSet<MovieId>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|m| large.contains(m)).count()
}

/// Memo of pairwise similarities keyed by unordered user pair.
///
/// Only worth having when the same orchestrator answers many queries; the
/// underlying data never changes, so entries never go stale.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    entries: Mutex<HashMap<(UserId, UserId), f64>>,
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, u1: &User, u2: &User) -> f64 {
        let key = if u1.id <= u2.id { (u1.id, u2.id) } else { (u2.id, u1.id) };

        if let Some(&value) = self.lock().get(&key) {
            return value;
        }
        // computed outside the lock; a racing worker may store the same value
        let value = similarity(u1, u2);
        self.lock().insert(key, value);
        value
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(UserId, UserId), f64>> {
        // a panicking writer can only leave a complete entry behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
