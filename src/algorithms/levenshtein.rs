//! Weighted Levenshtein (edit) distance
//!
//! - Single rolling row over the shorter string, O(min(m,n)) space
//! - Optional substitution weights (e.g. keyboard adjacency)
//! - Optional case folding
//! - A separate lower-bound entry point that stops as soon as a row is
//!   entirely at or above a threshold
//!
//! The exact and the bounded computations are deliberately two functions:
//! the bounded one may return less than the real distance and must never be
//! used to place a string in the tree.

use super::normalize::CaseMode;
use super::EditDistance;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Substitution cost between two distinct characters, shared between metrics.
pub type WeightFn = Arc<dyn Fn(char, char) -> usize + Send + Sync>;

/// Borrowed form of [`WeightFn`] accepted by the distance functions.
pub type Weights<'a> = Option<&'a (dyn Fn(char, char) -> usize + Send + Sync)>;

type CharBuf = SmallVec<[char; 64]>;

/// Row DP over `long` x `short`.
///
/// With `bound`, returns the minimum of the first completed row whose minimum
/// reaches the bound. Row minima never decrease, so that value is a lower
/// bound of the true distance.
fn dp_distance(long: &[char], short: &[char], weights: Weights<'_>, bound: Option<usize>) -> usize {
    let mut row: SmallVec<[usize; 64]> = (0..=short.len()).collect();

    for (i, &lc) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        let mut row_min = row[0];

        for (j, &sc) in short.iter().enumerate() {
            let cost = if lc == sc {
                0
            } else {
                weights.map_or(1, |w| w(lc, sc))
            };
            let substitution = diagonal.saturating_add(cost);
            let insertion = row[j + 1] + 1;
            let deletion = row[j] + 1;

            diagonal = row[j + 1];
            let cell = substitution.min(insertion).min(deletion);
            row[j + 1] = cell;
            row_min = row_min.min(cell);
        }

        if let Some(bound) = bound {
            if row_min >= bound {
                return row_min;
            }
        }
    }

    row[short.len()]
}

fn distance_impl(
    a: &str,
    b: &str,
    weights: Weights<'_>,
    case: CaseMode,
    bound: Option<usize>,
) -> usize {
    let a = case.apply(a);
    let b = case.apply(b);

    if a == b {
        return 0;
    }

    let a_chars: CharBuf = a.chars().collect();
    let b_chars: CharBuf = b.chars().collect();

    if a_chars.is_empty() || b_chars.is_empty() {
        return a_chars.len().max(b_chars.len());
    }

    // Keep the row on the shorter string
    if a_chars.len() < b_chars.len() {
        dp_distance(&b_chars, &a_chars, weights, bound)
    } else {
        dp_distance(&a_chars, &b_chars, weights, bound)
    }
}

/// Exact weighted edit distance.
///
/// Insertions and deletions cost 1, substituting two distinct characters
/// costs `weights(a, b)` or 1 without weights.
///
/// # Example
/// ```
/// use bkindex::algorithms::levenshtein::weighted_distance;
/// use bkindex::algorithms::normalize::CaseMode;
///
/// assert_eq!(weighted_distance("kitten", "sitting", None, CaseMode::Sensitive), 3);
/// assert_eq!(weighted_distance("Cake", "cake", None, CaseMode::Insensitive), 0);
/// ```
#[inline]
#[must_use]
pub fn weighted_distance(a: &str, b: &str, weights: Weights<'_>, case: CaseMode) -> usize {
    distance_impl(a, b, weights, case, None)
}

/// Edit distance that may stop early once every cell of a row is `>= max_distance`.
///
/// When it stops early the result is only a lower bound (at least
/// `max_distance`, at most the exact distance). Results below `max_distance`
/// are always exact.
///
/// # Example
/// ```
/// use bkindex::algorithms::levenshtein::distance_lower_bound;
/// use bkindex::algorithms::normalize::CaseMode;
///
/// // the exact distance is 6
/// assert_eq!(distance_lower_bound("abcdef", "ghijkl", 1, None, CaseMode::Sensitive), 1);
/// assert_eq!(distance_lower_bound("abc", "abd", 3, None, CaseMode::Sensitive), 1);
/// ```
#[inline]
#[must_use]
pub fn distance_lower_bound(
    a: &str,
    b: &str,
    max_distance: usize,
    weights: Weights<'_>,
    case: CaseMode,
) -> usize {
    distance_impl(a, b, weights, case, Some(max_distance))
}

/// Plain case-sensitive Levenshtein distance
#[inline]
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    weighted_distance(a, b, None, CaseMode::Sensitive)
}

/// Levenshtein metric with optional substitution weights and case folding.
///
/// This is the default metric of [`crate::indexing::BkTree`].
#[derive(Clone, Default)]
pub struct WeightedLevenshtein {
    weights: Option<WeightFn>,
    case: CaseMode,
}

impl WeightedLevenshtein {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_weights(mut self, weights: WeightFn) -> Self {
        self.weights = Some(weights);
        self
    }

    #[must_use]
    pub fn with_case(mut self, case: CaseMode) -> Self {
        self.case = case;
        self
    }

    #[must_use]
    pub fn case_insensitive(self) -> Self {
        self.with_case(CaseMode::Insensitive)
    }

    pub fn case(&self) -> CaseMode {
        self.case
    }

    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }
}

impl fmt::Debug for WeightedLevenshtein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedLevenshtein")
            .field("weighted", &self.weights.is_some())
            .field("case", &self.case)
            .finish()
    }
}

impl EditDistance for WeightedLevenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        weighted_distance(a, b, self.weights.as_deref(), self.case)
    }

    fn distance_lower_bound(&self, a: &str, b: &str, bound: usize) -> usize {
        distance_lower_bound(a, b, bound, self.weights.as_deref(), self.case)
    }

    fn name(&self) -> &'static str {
        if self.weights.is_some() {
            "weighted_levenshtein"
        } else {
            "levenshtein"
        }
    }
}
