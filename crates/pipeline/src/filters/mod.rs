//! Filter implementations for the candidate pipeline.
//!
//! Order matters: the seen-filter runs before the popularity filter so that
//! `n_users` is only ever stamped on movies the target has not rated.

pub mod already_seen;
pub mod popularity;

// Re-export for convenience
pub use already_seen::AlreadySeenFilter;
pub use popularity::PopularityFilter;
