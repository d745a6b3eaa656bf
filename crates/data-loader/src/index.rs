//! DataIndex building and indexing logic.
//!
//! Turns parsed rows into the structures the pipeline reads:
//! - the rating store (`UserId -> User` with liked / not-liked sets)
//! - the popularity index (like counts and likers per movie)

use crate::error::Result;
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

impl DataIndex {
    /// Load the catalog and the ratings from two CSV files.
    ///
    /// Steps:
    /// 1. Parse both files in parallel
    /// 2. Split every user's ratings into liked / not-liked
    /// 3. Build the popularity index
    #[instrument(skip(options), fields(movies = %movies_path.display(), ratings = %ratings_path.display()))]
    pub fn load_from_files(
        movies_path: &Path,
        ratings_path: &Path,
        options: &LoadOptions,
    ) -> Result<Self> {
        let (movies, ratings) = rayon::join(
            || parser::parse_movies(movies_path, options.malformed_rows),
            || parser::parse_ratings(ratings_path, options.malformed_rows),
        );
        let movies = movies?;
        let ratings = ratings?;

        info!("Parsed {} movies and {} ratings", movies.len(), ratings.len());

        let index = Self::from_parts(movies, ratings, options.liked_threshold);

        let (users, movies, liked_movies) = index.counts();
        info!(
            "DataIndex built: {} users, {} movies, {} movies with at least one like",
            users, movies, liked_movies
        );
        Ok(index)
    }

    /// Build an index from rows that are already in memory
    pub fn from_parts(movies: Vec<Movie>, ratings: Vec<Rating>, liked_threshold: f32) -> Self {
        Self::from_users(movies, build_users(ratings, liked_threshold).into_values())
    }

    /// Build an index from users whose liked / not-liked sets are already
    /// split. Lets a user with no ratings at all exist in the store.
    pub fn from_users(movies: Vec<Movie>, users: impl IntoIterator<Item = User>) -> Self {
        let movies = movies.into_iter().map(|m| (m.id, m)).collect();
        let users: HashMap<UserId, User> = users.into_iter().map(|u| (u.id, u)).collect();
        let popularity = PopularityIndex::build(&users);
        Self {
            movies,
            users,
            popularity,
        }
    }
}

/// Group ratings by user and classify each one against the liked threshold
pub fn build_users(
    ratings: impl IntoIterator<Item = Rating>,
    liked_threshold: f32,
) -> HashMap<UserId, User> {
    let mut users: HashMap<UserId, User> = HashMap::new();
    for rating in ratings {
        users
            .entry(rating.user_id)
            .or_insert_with(|| User::new(rating.user_id))
            .record(rating.movie_id, rating.rating >= liked_threshold);
    }
    users
}

impl PopularityIndex {
    /// Accumulate like counts and likers over every user's liked set.
    ///
    /// Runs as a rayon fold/reduce over users; the likers lists are sorted
    /// afterwards because the fold order is arbitrary.
    #[instrument(skip_all, fields(users = users.len()))]
    pub fn build(users: &HashMap<UserId, User>) -> Self {
        let mut likers: HashMap<MovieId, Vec<UserId>> = users
            .par_iter()
            .fold(
                HashMap::new,
                |mut local: HashMap<MovieId, Vec<UserId>>, (&user_id, user)| {
                    for &movie_id in &user.liked {
                        local.entry(movie_id).or_default().push(user_id);
                    }
                    local
                },
            )
            .reduce(HashMap::new, |mut acc, local| {
                for (movie_id, ids) in local {
                    acc.entry(movie_id).or_default().extend(ids);
                }
                acc
            });

        likers.par_iter_mut().for_each(|(_, ids)| ids.sort_unstable());

        let like_count = likers
            .iter()
            .map(|(&movie_id, ids)| (movie_id, ids.len()))
            .collect();

        Self { like_count, likers }
    }
}
