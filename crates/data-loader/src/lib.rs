//! # Data Loader Crate
//!
//! Loads the movie catalog and the rating observations and indexes them
//! for the recommendation pipeline.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (User, Movie, Rating, PopularityIndex, DataIndex)
//! - **parser**: Parse the CSV files into Rust structs
//! - **index**: Build the rating store and the popularity index
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{DataIndex, LoadOptions};
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(
//!     Path::new("movies.csv"),
//!     Path::new("ratings.csv"),
//!     &LoadOptions::default(),
//! )?;
//!
//! let user = index.get_user(1).unwrap();
//! println!("User {} liked {} movies", user.id, user.liked.len());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::build_users;
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    // Core types
    User,
    Movie,
    Rating,
    DataIndex,
    PopularityIndex,
    // Options
    LoadOptions,
    MalformedRowPolicy,
    DEFAULT_LIKED_THRESHOLD,
};
