//! Core domain types for the ratings dataset.
//!
//! This module defines the data structures shared by the loader and the
//! recommendation pipeline:
//! - Type aliases for domain clarity (UserId, MovieId)
//! - Raw rows as parsed from CSV (Movie, Rating)
//! - The per-user liked / not-liked split (User)
//! - The derived popularity index and the DataIndex that owns everything

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with movie IDs

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

/// Default rating at or above which an observation counts as "liked"
pub const DEFAULT_LIKED_THRESHOLD: f32 = 3.5;

// =============================================================================
// Load Options
// =============================================================================

/// What to do with a row that has the wrong shape or an unparsable number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MalformedRowPolicy {
    /// Fail the whole load on the first bad row
    #[default]
    Abort,
    /// Log the row and keep going
    Skip,
}

/// Tunables that affect how raw rows become a DataIndex
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadOptions {
    pub liked_threshold: f32,
    pub malformed_rows: MalformedRowPolicy,
}

impl LoadOptions {
    /// Configure the liked threshold (default: 3.5)
    pub fn with_liked_threshold(mut self, threshold: f32) -> Self {
        self.liked_threshold = threshold;
        self
    }

    /// Configure the malformed-row policy (default: Abort)
    pub fn with_malformed_rows(mut self, policy: MalformedRowPolicy) -> Self {
        self.malformed_rows = policy;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            liked_threshold: DEFAULT_LIKED_THRESHOLD,
            malformed_rows: MalformedRowPolicy::Abort,
        }
    }
}

// =============================================================================
// Raw Rows
// =============================================================================

/// A movie catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Pipe-separated genres split apart; the recommender never reads them
    pub genres: Vec<String>,
}

/// A single rating observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

// =============================================================================
// User
// =============================================================================

/// A user and the two disjoint sets of movies they rated.
///
/// `liked` holds movies rated at or above the liked threshold, `not_liked`
/// everything below it. A movie is never in both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub liked: HashSet<MovieId>,
    pub not_liked: HashSet<MovieId>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Record a rating, moving the movie between sets if it was rated before.
    /// The latest observation for a movie wins.
    pub fn record(&mut self, movie_id: MovieId, liked: bool) {
        if liked {
            self.not_liked.remove(&movie_id);
            self.liked.insert(movie_id);
        } else {
            self.liked.remove(&movie_id);
            self.not_liked.insert(movie_id);
        }
    }

    /// True if the user rated the movie either way
    pub fn has_rated(&self, movie_id: MovieId) -> bool {
        self.liked.contains(&movie_id) || self.not_liked.contains(&movie_id)
    }

    /// Total number of distinct movies rated
    pub fn rated_count(&self) -> usize {
        self.liked.len() + self.not_liked.len()
    }
}

// =============================================================================
// Popularity Index
// =============================================================================

/// Per-movie like counts and the users behind them.
///
/// Derived from the user map in one pass and never mutated afterwards.
/// `likers` lists are sorted by user id so iteration is deterministic even
/// though the user map itself is not ordered.
#[derive(Debug, Clone, Default)]
pub struct PopularityIndex {
    pub(crate) like_count: HashMap<MovieId, usize>,
    pub(crate) likers: HashMap<MovieId, Vec<UserId>>,
}

impl PopularityIndex {
    /// Number of users who liked the movie (0 if nobody did)
    pub fn like_count(&self, movie_id: MovieId) -> usize {
        self.like_count.get(&movie_id).copied().unwrap_or(0)
    }

    /// Users who liked the movie, ascending by id
    pub fn likers(&self, movie_id: MovieId) -> &[UserId] {
        self.likers
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of movies liked by at least one user
    pub fn len(&self) -> usize {
        self.like_count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.like_count.is_empty()
    }
}

// =============================================================================
// DataIndex - The Core In-Memory Database
// =============================================================================

/// Everything the recommender reads: the movie catalog, the rating store
/// (users keyed by id) and the popularity index derived from it.
///
/// Built once and then shared read-only behind an `Arc`, so no locking is
/// needed while a pipeline runs.
#[derive(Debug, Default)]
pub struct DataIndex {
    pub(crate) movies: HashMap<MovieId, Movie>,
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) popularity: PopularityIndex,
}

impl DataIndex {
    /// Get a user by ID
    pub fn get_user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Iterate over the whole catalog, in no particular order
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    pub fn popularity(&self) -> &PopularityIndex {
        &self.popularity
    }

    /// Get counts for debugging/validation: (users, movies, liked movies)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.users.len(), self.movies.len(), self.popularity.len())
    }
}
