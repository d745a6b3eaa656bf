//! Core trait for the filtering stages.
//!
//! A filter looks at one candidate at a time and either passes it on
//! (possibly annotated) or drops it.

use crate::types::Recommendation;

/// One-in, at-most-one-out transformation on a candidate.
///
/// ## Design Note
/// - `Send + Sync` because every filter runs as its own task
/// - Filters take ownership of the candidate and hand it back if it survives,
///   so a stage may annotate the fields it is responsible for
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Returns `Some` to keep the candidate, `None` to drop it
    fn apply(&self, candidate: Recommendation) -> Option<Recommendation>;
}
