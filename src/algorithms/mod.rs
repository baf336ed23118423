//! String distance algorithms used as the metric of the index
//!
//! Distances are plain functions for composability, with a trait-based
//! interface so the tree can take any metric.

pub mod keyboard;
pub mod levenshtein;
pub mod normalize;

pub use keyboard::*;
pub use levenshtein::*;
pub use normalize::CaseMode;

/// Trait for integer edit distances usable as a tree metric.
///
/// Implementations must return 0 for identical inputs and satisfy the
/// triangle inequality, or tree queries will miss matches.
pub trait EditDistance: Send + Sync {
    /// Exact distance between `a` and `b`.
    fn distance(&self, a: &str, b: &str) -> usize;

    /// Distance that may stop early once it is known to be at least `bound`.
    ///
    /// Values below `bound` must be exact; values at or above it may be
    /// smaller than the real distance. The default computes the exact distance.
    fn distance_lower_bound(&self, a: &str, b: &str, bound: usize) -> usize {
        let _ = bound;
        self.distance(a, b)
    }

    /// Name of the metric for debugging/logging
    fn name(&self) -> &'static str;
}
